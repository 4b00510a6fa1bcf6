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
//! Reconstruction of the exact bytes the device signs
//!
//! Each signing instruction hashes different material before the Ed25519
//! signature is produced: SIGN_DATA signs the raw bytes, SIGN_MSG signs a
//! BLAKE2b-256 digest over a prefixed message, SIGN_TX signs the network id
//! plus the digest of the canonical transaction encoding. These rules match
//! the shipped firmware and must not be unified. Rebuilding the same bytes on
//! the host is what makes a returned signature checkable against an
//! independently derived public key.

use blake2::{digest::typenum, Blake2b, Digest};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::responses::DecodeError;
use crate::tx::Transaction;

/// Prefix the device mixes into every free-form message digest
pub const MESSAGE_MAGIC: &str = "aeternity Signed Message:\n";

/// Marker mixed into the preimage when signing an inner transaction
pub const INNER_TX_MARKER: &[u8] = b"-inner_tx";

type Blake2b256 = Blake2b<typenum::U32>;

/// Bitcoin-style variable-length integer encoding.
///
/// Values up to 0xFC are a single byte; wider values carry a marker byte
/// (0xFD/0xFE/0xFF) followed by 2, 4 or 8 little-endian bytes.
pub fn varuint_encode(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    match value {
        0..=0xFC => out.push(value as u8),
        0xFD..=0xFFFF => {
            out.push(0xFD);
            out.write_u16::<LittleEndian>(value as u16).unwrap();
        }
        0x1_0000..=0xFFFF_FFFF => {
            out.push(0xFE);
            out.write_u32::<LittleEndian>(value as u32).unwrap();
        }
        _ => {
            out.push(0xFF);
            out.write_u64::<LittleEndian>(value).unwrap();
        }
    }
    out
}

/// Decode a [`varuint_encode`]d integer, returning the value and the number
/// of bytes consumed
pub fn varuint_decode(data: &[u8]) -> Result<(u64, usize), DecodeError> {
    let (marker, rest) = data.split_first().ok_or(DecodeError::Truncated {
        wanted: 1,
        available: 0,
    })?;
    let wide = |width: usize| {
        if rest.len() < width {
            Err(DecodeError::Truncated {
                wanted: width,
                available: rest.len(),
            })
        } else {
            Ok(())
        }
    };
    match *marker {
        0xFD => {
            wide(2)?;
            Ok((u64::from(LittleEndian::read_u16(rest)), 3))
        }
        0xFE => {
            wide(4)?;
            Ok((u64::from(LittleEndian::read_u32(rest)), 5))
        }
        0xFF => {
            wide(8)?;
            Ok((LittleEndian::read_u64(rest), 9))
        }
        small => Ok((u64::from(small), 1)),
    }
}

/// Bytes signed by SIGN_DATA: the input itself, unmodified
pub fn for_data(data: &[u8]) -> Vec<u8> {
    data.to_vec()
}

/// Digest signed by SIGN_MSG.
///
/// BLAKE2b-256 over `len(magic) || magic || varuint(len(message)) || message`.
pub fn for_message(message: &[u8]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(1 + MESSAGE_MAGIC.len() + 9 + message.len());
    buf.push(MESSAGE_MAGIC.len() as u8);
    buf.extend_from_slice(MESSAGE_MAGIC.as_bytes());
    buf.extend_from_slice(&varuint_encode(message.len() as u64));
    buf.extend_from_slice(message);
    blake2b256(&buf)
}

/// Bytes signed by SIGN_TX.
///
/// `network_id || BLAKE2b-256(rlp(tx))`, with the literal `-inner_tx` marker
/// spliced between the two iff the transaction is signed as an inner
/// transaction.
pub fn for_transaction(network_id: &[u8], inner_tx: bool, transaction: &Transaction) -> Vec<u8> {
    let digest = blake2b256(&transaction.encode());
    let mut preimage = Vec::with_capacity(network_id.len() + INNER_TX_MARKER.len() + digest.len());
    preimage.extend_from_slice(network_id);
    if inner_tx {
        preimage.extend_from_slice(INNER_TX_MARKER);
    }
    preimage.extend_from_slice(&digest);
    preimage
}

fn blake2b256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().into()
}
