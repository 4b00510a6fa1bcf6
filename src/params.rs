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
//! Wire constants and the status word taxonomy of the Aeternity app

use std::fmt;

/// APDU Class byte
pub const CLA: u8 = 0xE0;

/// P1 value requesting no on-screen confirmation (GET_ADDRESS)
pub const P1_CONFIRM_NOT_NEEDED: u8 = 0x00;

/// P1 value requesting on-screen confirmation (GET_ADDRESS)
pub const P1_CONFIRM_NEEDED: u8 = 0x01;

/// Ed25519 signature length returned by every signing instruction
pub const SIGNATURE_LEN: usize = 64;

/// APDU instruction codes
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Instruction {
    /// Derive and return the address for an account
    GetAddress = 0x02,
    /// Sign a spend transaction
    SignTx = 0x04,
    /// Get the app version
    GetVersion = 0x06,
    /// Sign a free-form message
    SignMsg = 0x08,
    /// Sign an opaque blob without any prefixing
    SignData = 0x0A,
}

/// Status word terminating every response.
///
/// Codes outside the known taxonomy are preserved in [`StatusWord::Unknown`]
/// rather than dropped, so callers can still report what the device said.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StatusWord {
    /// Success
    Ok,
    /// User rejected the request on the device
    Deny,
    /// Wrong P1 or P2 for the instruction
    WrongP1P2,
    /// Instruction code not supported
    InsNotSupported,
    /// Class byte not supported
    ClaNotSupported,
    /// Command data length does not match the instruction
    WrongApduLength,
    /// Device could not fit the response
    WrongResponseLength,
    /// BIP32 path could not be displayed
    DisplayBip32PathFail,
    /// Address could not be displayed
    DisplayAddressFail,
    /// Amount could not be displayed
    DisplayAmountFail,
    /// Transaction length field does not match the transaction
    WrongTxLength,
    /// Transaction could not be parsed
    TxParsingFail,
    /// Transaction could not be hashed
    TxHashFail,
    /// Device state machine in an unexpected state
    BadState,
    /// Transaction signature could not be computed
    TxSignFail,
    /// Message length field does not match the message
    MsgWrongLength,
    /// Message could not be hashed
    MsgHashFail,
    /// Message signature could not be computed
    MsgSignFail,
    /// Address inside a transaction could not be parsed
    AddressParsingFail,
    /// Any code outside the known taxonomy
    Unknown(u16),
}

impl StatusWord {
    /// Map a raw 16-bit status word to the taxonomy
    pub fn from_u16(sw: u16) -> Self {
        match sw {
            0x9000 => Self::Ok,
            0x6985 => Self::Deny,
            0x6A86 => Self::WrongP1P2,
            0x6D00 => Self::InsNotSupported,
            0x6E00 => Self::ClaNotSupported,
            0x6E03 => Self::WrongApduLength,
            0xB000 => Self::WrongResponseLength,
            0xB001 => Self::DisplayBip32PathFail,
            0xB002 => Self::DisplayAddressFail,
            0xB003 => Self::DisplayAmountFail,
            0xB004 => Self::WrongTxLength,
            0xB005 => Self::TxParsingFail,
            0xB006 => Self::TxHashFail,
            0xB007 => Self::BadState,
            0xB008 => Self::TxSignFail,
            0xB100 => Self::MsgWrongLength,
            0xB101 => Self::MsgHashFail,
            0xB102 => Self::MsgSignFail,
            0xB200 => Self::AddressParsingFail,
            other => Self::Unknown(other),
        }
    }

    /// The raw 16-bit status word
    pub fn as_u16(&self) -> u16 {
        match self {
            Self::Ok => 0x9000,
            Self::Deny => 0x6985,
            Self::WrongP1P2 => 0x6A86,
            Self::InsNotSupported => 0x6D00,
            Self::ClaNotSupported => 0x6E00,
            Self::WrongApduLength => 0x6E03,
            Self::WrongResponseLength => 0xB000,
            Self::DisplayBip32PathFail => 0xB001,
            Self::DisplayAddressFail => 0xB002,
            Self::DisplayAmountFail => 0xB003,
            Self::WrongTxLength => 0xB004,
            Self::TxParsingFail => 0xB005,
            Self::TxHashFail => 0xB006,
            Self::BadState => 0xB007,
            Self::TxSignFail => 0xB008,
            Self::MsgWrongLength => 0xB100,
            Self::MsgHashFail => 0xB101,
            Self::MsgSignFail => 0xB102,
            Self::AddressParsingFail => 0xB200,
            Self::Unknown(other) => *other,
        }
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "success",
            Self::Deny => "request denied by user",
            Self::WrongP1P2 => "wrong P1/P2",
            Self::InsNotSupported => "instruction not supported",
            Self::ClaNotSupported => "class not supported",
            Self::WrongApduLength => "wrong APDU length",
            Self::WrongResponseLength => "wrong response length",
            Self::DisplayBip32PathFail => "BIP32 path display failed",
            Self::DisplayAddressFail => "address display failed",
            Self::DisplayAmountFail => "amount display failed",
            Self::WrongTxLength => "wrong transaction length",
            Self::TxParsingFail => "transaction parsing failed",
            Self::TxHashFail => "transaction hashing failed",
            Self::BadState => "bad device state",
            Self::TxSignFail => "transaction signing failed",
            Self::MsgWrongLength => "wrong message length",
            Self::MsgHashFail => "message hashing failed",
            Self::MsgSignFail => "message signing failed",
            Self::AddressParsingFail => "address parsing failed",
            Self::Unknown(_) => "unknown status word",
        };
        write!(f, "{} (0x{:04X})", name, self.as_u16())
    }
}
