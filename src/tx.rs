/*******************************************************************************
*   (c) 2023 Zondax GmbH
*
*  Licensed under the Apache License, Version 2.0 (the "License");
*  you may not use this file except in compliance with the License.
*  You may obtain a copy of the License at
*
*      http://www.apache.org/licenses/LICENSE-2.0
*
*  Unless required by applicable law or agreed to in writing, software
*  distributed under the License is distributed on an "AS IS" BASIS,
*  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
*  See the License for the specific language governing permissions and
*  limitations under the License.
********************************************************************************/
//! Spend transaction entity and its canonical encoding

use crate::rlp::ListEncoder;

/// Transaction kind tag for a spend transaction
pub const SPEND_TX_TAG: u64 = 0x0C;

/// A transaction to be signed by the device.
///
/// The field order is fixed and is part of the wire contract: it drives the
/// canonical encoding and therefore the hash the device signs. Build one,
/// hand it to [`encode`](Transaction::encode) or the signing call, and do not
/// mutate it in between, or the host-side verification preimage will diverge
/// from what was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction kind (see [`SPEND_TX_TAG`])
    pub tag: u64,
    /// Schema version of the transaction kind
    pub vsn: u64,
    /// Sender account identifier (id tag byte + 32-byte public key)
    pub sender: Vec<u8>,
    /// Recipient account identifier
    pub recipient: Vec<u8>,
    /// Amount to transfer, in aettos
    pub amount: u128,
    /// Transaction fee, in aettos
    pub fee: u128,
    /// Height after which the transaction expires, 0 for no expiry
    pub ttl: u64,
    /// Sender account nonce
    pub nonce: u64,
    /// Free-form payload, may be empty
    pub payload: Vec<u8>,
}

impl Transaction {
    /// Canonically encode the transaction as a single RLP list.
    ///
    /// The same bytes are used as the wire payload and, hashed, as part of
    /// the signing preimage; the encoding is deterministic and has no side
    /// effects.
    pub fn encode(&self) -> Vec<u8> {
        ListEncoder::new()
            .uint(self.tag.into())
            .uint(self.vsn.into())
            .bytes(&self.sender)
            .bytes(&self.recipient)
            .uint(self.amount)
            .uint(self.fee)
            .uint(self.ttl.into())
            .uint(self.nonce.into())
            .bytes(&self.payload)
            .finish()
    }
}
