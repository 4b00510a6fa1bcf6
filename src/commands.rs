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
//! Outbound command construction
//!
//! Builders are pure: identical inputs always produce identical bytes, which
//! is what lets the verification side rebuild the exact preimage the device
//! saw. Inputs that cannot be represented in the framing are rejected before
//! anything is sent.

use byteorder::{BigEndian, WriteBytesExt};

use crate::params::{Instruction, CLA, P1_CONFIRM_NEEDED, P1_CONFIRM_NOT_NEEDED};
use crate::transport::ApduCommand;
use crate::tx::Transaction;

/// Caller input that does not fit the command framing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInput {
    /// Body length does not fit the 4-byte length prefix
    #[error("body of {0} bytes exceeds the 4-byte length prefix")]
    BodyTooLong(usize),

    /// Network id length does not fit the 1-byte length prefix
    #[error("network id of {0} bytes exceeds the 1-byte length prefix")]
    NetworkIdTooLong(usize),
}

/// GET_VERSION carries no data
pub fn get_version() -> ApduCommand {
    ApduCommand {
        cla: CLA,
        ins: Instruction::GetVersion as u8,
        p1: 0x00,
        p2: 0x00,
        data: Vec::new(),
    }
}

/// GET_ADDRESS: account number, confirmation selected through P1
pub fn get_address(account_number: u32, require_confirmation: bool) -> ApduCommand {
    let p1 = if require_confirmation {
        P1_CONFIRM_NEEDED
    } else {
        P1_CONFIRM_NOT_NEEDED
    };

    let mut data = Vec::with_capacity(4);
    data.write_u32::<BigEndian>(account_number).unwrap();

    ApduCommand {
        cla: CLA,
        ins: Instruction::GetAddress as u8,
        p1,
        p2: 0x00,
        data,
    }
}

/// SIGN_MSG: account number, message length, message.
///
/// The magic prefix is not added here; the device builds the full digest
/// input itself (see [`crate::preimage::for_message`]).
pub fn sign_message(account_number: u32, message: &[u8]) -> Result<ApduCommand, InvalidInput> {
    Ok(ApduCommand {
        cla: CLA,
        ins: Instruction::SignMsg as u8,
        p1: 0x00,
        p2: 0x00,
        data: sized_body(account_number, message)?,
    })
}

/// SIGN_DATA: account number, blob length, blob
pub fn sign_data(account_number: u32, data: &[u8]) -> Result<ApduCommand, InvalidInput> {
    Ok(ApduCommand {
        cla: CLA,
        ins: Instruction::SignData as u8,
        p1: 0x00,
        p2: 0x00,
        data: sized_body(account_number, data)?,
    })
}

/// SIGN_TX: account number, encoded transaction length, inner-tx flag,
/// size-prefixed network id, canonical transaction encoding
pub fn sign_transaction(
    account_number: u32,
    inner_tx: bool,
    network_id: &[u8],
    transaction: &Transaction,
) -> Result<ApduCommand, InvalidInput> {
    let network_id_len =
        u8::try_from(network_id.len()).map_err(|_| InvalidInput::NetworkIdTooLong(network_id.len()))?;

    let encoded = transaction.encode();
    let encoded_len =
        u32::try_from(encoded.len()).map_err(|_| InvalidInput::BodyTooLong(encoded.len()))?;

    let mut data = Vec::with_capacity(10 + network_id.len() + encoded.len());
    data.write_u32::<BigEndian>(account_number).unwrap();
    data.write_u32::<BigEndian>(encoded_len).unwrap();
    data.push(u8::from(inner_tx));
    data.push(network_id_len);
    data.extend_from_slice(network_id);
    data.extend_from_slice(&encoded);

    Ok(ApduCommand {
        cla: CLA,
        ins: Instruction::SignTx as u8,
        p1: 0x00,
        p2: 0x00,
        data,
    })
}

fn sized_body(account_number: u32, body: &[u8]) -> Result<Vec<u8>, InvalidInput> {
    let body_len = u32::try_from(body.len()).map_err(|_| InvalidInput::BodyTooLong(body.len()))?;

    let mut data = Vec::with_capacity(8 + body.len());
    data.write_u32::<BigEndian>(account_number).unwrap();
    data.write_u32::<BigEndian>(body_len).unwrap();
    data.extend_from_slice(body);
    Ok(data)
}
