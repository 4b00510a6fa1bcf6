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
//! Decoding of success payloads into typed results
//!
//! Every decoder enforces the exact length contract of its instruction and
//! fails loudly on violations; none of them ever returns a partial or
//! zero-filled result.

use std::str;

use crate::params::SIGNATURE_LEN;
use crate::{Address, Signature, Version};

/// A success status word arrived with a payload that violates the
/// instruction's length contract
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Buffer ended before a field was complete
    #[error("response truncated: wanted {wanted} more bytes, {available} available")]
    Truncated {
        /// Bytes the next field needed
        wanted: usize,
        /// Bytes actually left in the buffer
        available: usize,
    },

    /// Payload is not the fixed size the instruction mandates
    #[error("wrong response length: expected {expected} bytes, got {actual}")]
    Length {
        /// Mandated payload size
        expected: usize,
        /// Received payload size
        actual: usize,
    },

    /// Bytes were left over after the last field
    #[error("{0} trailing bytes after the last field")]
    TrailingBytes(usize),

    /// Address field contained non-ASCII bytes
    #[error("address field is not printable ASCII")]
    NotAscii,
}

/// Split one size-prefixed field off a buffer.
///
/// Reads a single length byte followed by that many bytes and returns the
/// field and the remainder. This is the building block for any 1-byte
/// length-prefixed response field; it never copies and never assumes any
/// terminator.
pub fn split_size_prefixed(buffer: &[u8]) -> Result<(&[u8], &[u8]), DecodeError> {
    let (len, rest) = buffer.split_first().ok_or(DecodeError::Truncated {
        wanted: 1,
        available: 0,
    })?;
    let len = usize::from(*len);
    if rest.len() < len {
        return Err(DecodeError::Truncated {
            wanted: len,
            available: rest.len(),
        });
    }
    Ok(rest.split_at(len))
}

/// Decode a GET_VERSION payload: exactly major, minor and patch bytes
pub fn decode_version(data: &[u8]) -> Result<Version, DecodeError> {
    match *data {
        [major, minor, patch] => Ok(Version {
            major,
            minor,
            patch,
        }),
        _ => Err(DecodeError::Length {
            expected: 3,
            actual: data.len(),
        }),
    }
}

/// Decode a GET_ADDRESS payload: one size-prefixed ASCII string and nothing
/// after it
pub fn decode_address(data: &[u8]) -> Result<Address, DecodeError> {
    let (address, rest) = split_size_prefixed(data)?;
    if !rest.is_empty() {
        return Err(DecodeError::TrailingBytes(rest.len()));
    }
    let address = str::from_utf8(address).map_err(|_| DecodeError::NotAscii)?;
    if !address.is_ascii() {
        return Err(DecodeError::NotAscii);
    }
    Ok(Address(address.to_owned()))
}

/// Decode a signing payload: exactly 64 signature bytes
pub fn decode_signature(data: &[u8]) -> Result<Signature, DecodeError> {
    let sig: [u8; SIGNATURE_LEN] = data.try_into().map_err(|_| DecodeError::Length {
        expected: SIGNATURE_LEN,
        actual: data.len(),
    })?;
    Ok(Signature(sig))
}
