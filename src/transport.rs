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
//! APDU framing types and the transport boundary
//!
//! The library never talks to USB/HID/TCP itself; it hands a fully built
//! [`ApduCommand`] to an [`Exchange`] implementation and gets back the raw
//! payload plus status word as an [`ApduAnswer`]. Multi-packet chunking, if
//! the underlying link needs it, is the transport's concern.

use async_trait::async_trait;
use byteorder::{BigEndian, WriteBytesExt};

use crate::params::StatusWord;

/// Framing errors crossing the transport boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Raw answer shorter than the two-byte status word
    #[error("answer of {0} bytes is too short to carry a status word")]
    TooShort(usize),

    /// Command body does not fit even extended-length framing
    #[error("command body of {0} bytes does not fit extended-length framing")]
    Oversize(usize),
}

/// An APDU command: header bytes plus data payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    /// Class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// First parameter byte
    pub p1: u8,
    /// Second parameter byte
    pub p2: u8,
    /// Command data payload
    pub data: Vec<u8>,
}

impl ApduCommand {
    /// Serialize to raw wire bytes.
    ///
    /// Bodies up to 255 bytes use the single-byte Lc field; larger bodies use
    /// ISO 7816 extended length (0x00 marker followed by a 16-bit big-endian
    /// length).
    pub fn serialize(&self) -> Result<Vec<u8>, FrameError> {
        let mut v = vec![self.cla, self.ins, self.p1, self.p2];
        match self.data.len() {
            n @ 0..=0xFF => v.push(n as u8),
            n @ 0x100..=0xFFFF => {
                v.push(0x00);
                v.write_u16::<BigEndian>(n as u16).unwrap();
            }
            n => return Err(FrameError::Oversize(n)),
        }
        v.extend_from_slice(&self.data);
        Ok(v)
    }
}

/// An APDU answer: response payload plus status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduAnswer {
    /// Response payload, empty on most failures
    pub data: Vec<u8>,
    /// Raw 16-bit status word
    pub retcode: u16,
}

impl ApduAnswer {
    /// Split raw wire bytes into payload and trailing big-endian status word
    pub fn from_answer(raw: Vec<u8>) -> Result<Self, FrameError> {
        if raw.len() < 2 {
            return Err(FrameError::TooShort(raw.len()));
        }
        let (data, sw) = raw.split_at(raw.len() - 2);
        Ok(ApduAnswer {
            data: data.to_vec(),
            retcode: u16::from(sw[0]) << 8 | u16::from(sw[1]),
        })
    }

    /// The status word mapped onto the app taxonomy
    pub fn status(&self) -> StatusWord {
        StatusWord::from_u16(self.retcode)
    }
}

/// Transport primitive consumed by the library.
///
/// An implementation delivers one full command and blocks until the full
/// answer is available. For commands that trigger an on-device confirmation
/// screen the returned future completes only once the user has decided.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Transport level error
    type Error: std::error::Error + Send + 'static;

    /// Exchange one command for one answer
    async fn exchange(&self, command: ApduCommand) -> Result<ApduAnswer, Self::Error>;
}
