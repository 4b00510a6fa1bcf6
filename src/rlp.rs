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
//! Recursive-length-prefix encoding
//!
//! Only the subset the spend transaction needs: a single list of byte-string
//! and unsigned-integer items. Integers encode as their minimal big-endian
//! representation (zero is the empty byte string), so structurally equal
//! values always serialize to identical bytes.

const STRING_SHORT: u8 = 0x80;
const STRING_LONG: u8 = 0xB7;
const LIST_SHORT: u8 = 0xC0;
const LIST_LONG: u8 = 0xF7;

/// Item payloads up to this length carry their size in the tag byte
const SHORT_MAX: usize = 55;

/// Builder for one RLP list value
pub struct ListEncoder {
    body: Vec<u8>,
}

impl ListEncoder {
    /// Start an empty list
    pub fn new() -> Self {
        ListEncoder { body: Vec::new() }
    }

    /// Append a byte-string item
    pub fn bytes(mut self, field: &[u8]) -> Self {
        append_bytes(&mut self.body, field);
        self
    }

    /// Append an unsigned-integer item as its minimal big-endian bytes
    pub fn uint(self, value: u128) -> Self {
        let raw = value.to_be_bytes();
        let first = raw.iter().position(|b| *b != 0).unwrap_or(raw.len());
        self.bytes(&raw[first..])
    }

    /// Wrap the accumulated items into the final list value
    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + 9);
        append_length(&mut out, self.body.len(), LIST_SHORT, LIST_LONG);
        out.extend_from_slice(&self.body);
        out
    }
}

impl Default for ListEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn append_bytes(out: &mut Vec<u8>, field: &[u8]) {
    // A lone byte below 0x80 is its own encoding
    if field.len() == 1 && field[0] < STRING_SHORT {
        out.push(field[0]);
        return;
    }
    append_length(out, field.len(), STRING_SHORT, STRING_LONG);
    out.extend_from_slice(field);
}

fn append_length(out: &mut Vec<u8>, len: usize, short_base: u8, long_base: u8) {
    if len <= SHORT_MAX {
        out.push(short_base + len as u8);
    } else {
        let raw = (len as u64).to_be_bytes();
        let first = raw.iter().position(|b| *b != 0).unwrap_or(raw.len());
        out.push(long_base + (raw.len() - first) as u8);
        out.extend_from_slice(&raw[first..]);
    }
}
