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
//! In-process mock of the Aeternity app
//!
//! Parses commands and signs the way the firmware does, independently of the
//! library under test, so the host-side preimage reconstruction is checked
//! against a second implementation rather than against itself. User
//! decisions are staged with [`MockDevice::approve`]/[`MockDevice::reject`]
//! before the pending exchange is resolved.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use blake2::{digest::typenum, Blake2b, Digest};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use once_cell::sync::Lazy;
use sha2::Sha256;

use ledger_aeternity::{ApduAnswer, ApduCommand, Exchange};

/// Seed of the standard `abandon ... about` test mnemonic
pub static SEED: Lazy<[u8; 64]> = Lazy::new(|| {
    let raw = hex::decode(
        "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc1\
         9a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4",
    )
    .unwrap();
    raw.try_into().unwrap()
});

const HARDENED: u32 = 0x8000_0000;
const AE_COIN_TYPE: u32 = 457;

const SIGN_MAGIC: &str = "aeternity Signed Message:\n";
const NETWORK_ID_MAX_LENGTH: usize = 32;

const SW_OK: u16 = 0x9000;
const SW_DENY: u16 = 0x6985;
const SW_WRONG_P1P2: u16 = 0x6A86;
const SW_INS_NOT_SUPPORTED: u16 = 0x6D00;
const SW_CLA_NOT_SUPPORTED: u16 = 0x6E00;
const SW_WRONG_APDU_LENGTH: u16 = 0x6E03;
const SW_WRONG_TX_LENGTH: u16 = 0xB004;
const SW_TX_PARSING_FAIL: u16 = 0xB005;
const SW_MSG_WRONG_LENGTH: u16 = 0xB100;

/// Derivation path the firmware uses: m/44'/457'/account'/0'/0'
pub fn account_path(account: u32) -> [u32; 5] {
    [
        HARDENED | 44,
        HARDENED | AE_COIN_TYPE,
        HARDENED | account,
        HARDENED,
        HARDENED,
    ]
}

/// SLIP-0010 key the device would derive for an account
pub fn account_key(account: u32) -> SigningKey {
    let raw = slip10_ed25519::derive_ed25519_private_key(&*SEED, &account_path(account));
    SigningKey::from_bytes(&raw)
}

/// Public key the signatures must verify against
pub fn account_public_key(account: u32) -> VerifyingKey {
    account_key(account).verifying_key()
}

/// Host-side reference address: `ak_` plus base58check of the public key
pub fn reference_address(account: u32) -> String {
    let key = account_public_key(account);
    format!(
        "ak_{}",
        bs58::encode(key.as_bytes()).with_check().into_string()
    )
}

/// Handle to a simulated device; clones share state
#[derive(Clone)]
pub struct MockDevice {
    state: Arc<DeviceState>,
}

struct DeviceState {
    seed: [u8; 64],
    version: (u8, u8, u8),
    decision: Mutex<Option<bool>>,
}

impl MockDevice {
    /// Device with the standard test seed, reporting the crate version
    pub fn new() -> Self {
        MockDevice {
            state: Arc::new(DeviceState {
                seed: *SEED,
                version: package_version(),
                decision: Mutex::new(None),
            }),
        }
    }

    /// Stage an approval for the next confirmation screen
    pub fn approve(&self) {
        *self.state.decision.lock().unwrap() = Some(true);
    }

    /// Stage a rejection for the next confirmation screen
    pub fn reject(&self) {
        *self.state.decision.lock().unwrap() = Some(false);
    }

    fn take_decision(&self) -> bool {
        self.state
            .decision
            .lock()
            .unwrap()
            .take()
            .expect("no user decision staged for a confirmation screen")
    }

    fn signing_key(&self, account: u32) -> SigningKey {
        let raw = slip10_ed25519::derive_ed25519_private_key(&self.state.seed, &account_path(account));
        SigningKey::from_bytes(&raw)
    }

    fn sign_with(&self, account: u32, data: &[u8]) -> Vec<u8> {
        self.signing_key(account).sign(data).to_bytes().to_vec()
    }

    fn handle(&self, command: &ApduCommand) -> (Vec<u8>, u16) {
        if command.cla != 0xE0 {
            return (Vec::new(), SW_CLA_NOT_SUPPORTED);
        }
        match (command.ins, command.p1, command.p2) {
            (0x06, 0x00, 0x00) => {
                let (major, minor, patch) = self.state.version;
                (vec![major, minor, patch], SW_OK)
            }
            (0x02, p1 @ (0x00 | 0x01), 0x00) => self.get_address(&command.data, p1 == 0x01),
            (0x04, 0x00, 0x00) => self.sign_tx(&command.data),
            (0x08, 0x00, 0x00) => self.sign_message(&command.data),
            (0x0A, 0x00, 0x00) => self.sign_blob(&command.data),
            (0x02 | 0x04 | 0x06 | 0x08 | 0x0A, _, _) => (Vec::new(), SW_WRONG_P1P2),
            _ => (Vec::new(), SW_INS_NOT_SUPPORTED),
        }
    }

    fn get_address(&self, data: &[u8], confirm: bool) -> (Vec<u8>, u16) {
        let Ok(account_bytes) = <[u8; 4]>::try_from(data) else {
            return (Vec::new(), SW_WRONG_APDU_LENGTH);
        };
        let account = u32::from_be_bytes(account_bytes);
        if confirm && !self.take_decision() {
            return (Vec::new(), SW_DENY);
        }
        let address = self.device_address(account);
        let mut out = vec![address.len() as u8];
        out.extend_from_slice(address.as_bytes());
        (out, SW_OK)
    }

    fn sign_message(&self, data: &[u8]) -> (Vec<u8>, u16) {
        let Some((account, message)) = split_account_body(data) else {
            return (Vec::new(), SW_MSG_WRONG_LENGTH);
        };
        if !self.take_decision() {
            return (Vec::new(), SW_DENY);
        }
        // Firmware hashes len(magic) || magic || varuint(len) || message
        let mut to_hash = vec![SIGN_MAGIC.len() as u8];
        to_hash.extend_from_slice(SIGN_MAGIC.as_bytes());
        to_hash.extend_from_slice(&firmware_varuint(message.len() as u64));
        to_hash.extend_from_slice(message);
        let digest = blake2b_256(&to_hash);
        (self.sign_with(account, &digest), SW_OK)
    }

    fn sign_blob(&self, data: &[u8]) -> (Vec<u8>, u16) {
        let Some((account, blob)) = split_account_body(data) else {
            return (Vec::new(), SW_MSG_WRONG_LENGTH);
        };
        if !self.take_decision() {
            return (Vec::new(), SW_DENY);
        }
        // Raw bytes, no hashing layer
        (self.sign_with(account, blob), SW_OK)
    }

    fn sign_tx(&self, data: &[u8]) -> (Vec<u8>, u16) {
        if data.len() < 10 {
            return (Vec::new(), SW_TX_PARSING_FAIL);
        }
        let account = u32::from_be_bytes(data[0..4].try_into().unwrap());
        let tx_len = u32::from_be_bytes(data[4..8].try_into().unwrap()) as usize;
        let inner = match data[8] {
            0x00 => false,
            0x01 => true,
            _ => return (Vec::new(), SW_TX_PARSING_FAIL),
        };
        let network_id_len = usize::from(data[9]);
        if network_id_len > NETWORK_ID_MAX_LENGTH || data.len() < 10 + network_id_len {
            return (Vec::new(), SW_TX_PARSING_FAIL);
        }
        let network_id = &data[10..10 + network_id_len];
        let tx = &data[10 + network_id_len..];
        if tx.len() != tx_len {
            return (Vec::new(), SW_WRONG_TX_LENGTH);
        }
        if !self.take_decision() {
            return (Vec::new(), SW_DENY);
        }
        let digest = blake2b_256(tx);
        let mut to_sign = network_id.to_vec();
        if inner {
            to_sign.extend_from_slice(b"-inner_tx");
        }
        to_sign.extend_from_slice(&digest);
        (self.sign_with(account, &to_sign), SW_OK)
    }

    fn device_address(&self, account: u32) -> String {
        // Firmware-style base58check: double SHA-256, first four bytes appended
        let public = self.signing_key(account).verifying_key();
        let mut payload = public.as_bytes().to_vec();
        payload.extend_from_slice(&double_sha256_check(public.as_bytes()));
        format!("ak_{}", bs58::encode(payload).into_string())
    }
}

#[async_trait]
impl Exchange for MockDevice {
    type Error = Infallible;

    async fn exchange(&self, command: ApduCommand) -> Result<ApduAnswer, Infallible> {
        let (data, retcode) = self.handle(&command);
        Ok(ApduAnswer { data, retcode })
    }
}

fn package_version() -> (u8, u8, u8) {
    let mut parts = env!("CARGO_PKG_VERSION")
        .split('.')
        .map(|part| part.parse().unwrap());
    (
        parts.next().unwrap(),
        parts.next().unwrap(),
        parts.next().unwrap(),
    )
}

fn split_account_body(data: &[u8]) -> Option<(u32, &[u8])> {
    if data.len() < 8 {
        return None;
    }
    let account = u32::from_be_bytes(data[0..4].try_into().unwrap());
    let len = u32::from_be_bytes(data[4..8].try_into().unwrap()) as usize;
    let body = &data[8..];
    (body.len() == len).then_some((account, body))
}

fn firmware_varuint(len: u64) -> Vec<u8> {
    if len <= 0xFC {
        vec![len as u8]
    } else if len <= 0xFFFF {
        let mut out = vec![0xFD];
        out.extend_from_slice(&(len as u16).to_le_bytes());
        out
    } else if len <= 0xFFFF_FFFF {
        let mut out = vec![0xFE];
        out.extend_from_slice(&(len as u32).to_le_bytes());
        out
    } else {
        let mut out = vec![0xFF];
        out.extend_from_slice(&len.to_le_bytes());
        out
    }
}

fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b::<typenum::U32>::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn double_sha256_check(input: &[u8]) -> [u8; 4] {
    let first = Sha256::digest(input);
    let second = Sha256::digest(first);
    second[0..4].try_into().unwrap()
}
