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
//! Support library for the Aeternity Ledger Nano app
//!
//! Builds wire-exact commands for the app, decodes its responses, and
//! rebuilds the signing preimages so that returned signatures can be checked
//! against independently derived Ed25519 public keys. The byte transport is
//! pluggable through [`Exchange`].

#![deny(warnings, trivial_casts, trivial_numeric_casts)]
#![deny(unused_import_braces, unused_qualifications)]
#![deny(missing_docs)]
#![doc(html_root_url = "https://docs.rs/ledger-aeternity/0.4.1")]

pub mod commands;
mod confirm;
pub mod params;
pub mod preimage;
pub mod responses;
pub mod rlp;
pub mod transport;
pub mod tx;

pub use commands::InvalidInput;
pub use confirm::PendingExchange;
pub use params::{Instruction, StatusWord, CLA};
pub use responses::DecodeError;
pub use transport::{ApduAnswer, ApduCommand, Exchange, FrameError};
pub use tx::Transaction;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use ed25519_dalek::{Signature as RawSignature, Verifier, VerifyingKey};
use log::debug;

/// Aeternity App Error
#[derive(Debug, thiserror::Error)]
pub enum Error<E: std::error::Error> {
    /// Transport-level failure, nothing useful reached the device
    #[error("transport error: {0}")]
    Transport(E),

    /// The device answered with a non-success status word.
    ///
    /// `data` carries whatever diagnostic bytes came with it; it is empty on
    /// a user refusal.
    #[error("device returned {status}")]
    Device {
        /// Reported status word
        status: StatusWord,
        /// Diagnostic payload, if any
        data: Vec<u8>,
    },

    /// Success status word but a payload violating the length contract
    #[error("malformed response: {0}")]
    Response(#[from] DecodeError),

    /// Caller input rejected before anything was sent
    #[error("invalid input: {0}")]
    Input(#[from] InvalidInput),

    /// A confirmation exchange is already outstanding on this handle
    #[error("a confirmation exchange is already in progress")]
    ExchangeInProgress,
}

impl<E: std::error::Error> Error<E> {
    /// Whether this is the user rejecting the request on the device
    pub fn is_user_refusal(&self) -> bool {
        matches!(
            self,
            Error::Device {
                status: StatusWord::Deny,
                ..
            }
        )
    }
}

/// Failure interpreting an [`Address`] as a public key
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    /// Account addresses must start with the `ak_` prefix
    #[error("address does not start with \"ak_\"")]
    MissingPrefix,

    /// Base58check decoding failed
    #[error("base58check decoding failed: {0}")]
    Base58(#[from] bs58::decode::Error),

    /// Decoded key material has the wrong size
    #[error("decoded key is {0} bytes, expected 32")]
    KeyLength(usize),

    /// Decoded bytes are not a valid Ed25519 public key
    #[error("decoded key is not a valid Ed25519 public key")]
    InvalidKey,
}

/// Aeternity app version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    /// Version Major
    pub major: u8,
    /// Version Minor
    pub minor: u8,
    /// Version Patch
    pub patch: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Account address as displayed by the app: `ak_` followed by the
/// base58check encoding of the account's Ed25519 public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address(pub String);

impl Address {
    /// The address string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the raw public key the address encodes
    pub fn to_public_key(&self) -> Result<VerifyingKey, AddressError> {
        let encoded = self
            .0
            .strip_prefix("ak_")
            .ok_or(AddressError::MissingPrefix)?;
        let decoded = bs58::decode(encoded).with_check(None).into_vec()?;
        let key: [u8; 32] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::KeyLength(decoded.len()))?;
        VerifyingKey::from_bytes(&key).map_err(|_| AddressError::InvalidKey)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Detached Ed25519 signature returned by the signing instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// The raw signature bytes
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Check the signature against a public key and the signed bytes.
    ///
    /// `data` must be the exact preimage the device signed for the operation
    /// (see [`preimage`]); for SIGN_MSG that is the 32-byte digest, not the
    /// message itself.
    pub fn verify(&self, public_key: &VerifyingKey, data: &[u8]) -> bool {
        public_key
            .verify(data, &RawSignature::from_bytes(&self.0))
            .is_ok()
    }
}

/// Aeternity App
pub struct AeternityApp<E> {
    pub(crate) transport: E,
    pub(crate) exchange_in_flight: AtomicBool,
    pub(crate) last_answer: Mutex<Option<ApduAnswer>>,
}

impl<E: Exchange> AeternityApp<E> {
    /// Create a new app handle over the given transport
    pub fn new(transport: E) -> Self {
        AeternityApp {
            transport,
            exchange_in_flight: AtomicBool::new(false),
            last_answer: Mutex::new(None),
        }
    }

    /// Retrieve the app version
    pub async fn version(&self) -> Result<Version, Error<E::Error>> {
        debug!("requesting app version");
        let payload = self.request(commands::get_version()).await?;
        Ok(responses::decode_version(&payload)?)
    }

    /// Retrieve the address for an account without on-device confirmation
    pub async fn address(&self, account_number: u32) -> Result<Address, Error<E::Error>> {
        debug!("requesting address for account {account_number}");
        let payload = self
            .request(commands::get_address(account_number, false))
            .await?;
        Ok(responses::decode_address(&payload)?)
    }

    /// Request the address for an account with on-device confirmation
    pub fn begin_address(
        &self,
        account_number: u32,
    ) -> Result<PendingExchange<'_, E, Address>, Error<E::Error>> {
        debug!("requesting address for account {account_number} with confirmation");
        PendingExchange::new(
            self,
            commands::get_address(account_number, true),
            responses::decode_address,
        )
    }

    /// Retrieve the address for an account, driving the on-device
    /// confirmation through `user_action`
    pub async fn address_confirmed<A, F>(
        &self,
        account_number: u32,
        user_action: A,
    ) -> Result<Address, Error<E::Error>>
    where
        A: FnOnce() -> F,
        F: Future<Output = ()>,
    {
        self.begin_address(account_number)?
            .confirm_with(user_action)
            .await
    }

    /// Request a signature over a free-form message
    pub fn begin_sign_message(
        &self,
        account_number: u32,
        message: &[u8],
    ) -> Result<PendingExchange<'_, E, Signature>, Error<E::Error>> {
        let command = commands::sign_message(account_number, message)?;
        debug!(
            "signing {}-byte message with account {account_number}",
            message.len()
        );
        PendingExchange::new(self, command, responses::decode_signature)
    }

    /// Sign a free-form message, driving the on-device confirmation through
    /// `user_action`.
    ///
    /// The device signs `BLAKE2b-256` of the prefixed message, reproducible
    /// with [`preimage::for_message`].
    pub async fn sign_message<A, F>(
        &self,
        account_number: u32,
        message: &[u8],
        user_action: A,
    ) -> Result<Signature, Error<E::Error>>
    where
        A: FnOnce() -> F,
        F: Future<Output = ()>,
    {
        self.begin_sign_message(account_number, message)?
            .confirm_with(user_action)
            .await
    }

    /// Request a signature over an opaque blob
    pub fn begin_sign_data(
        &self,
        account_number: u32,
        data: &[u8],
    ) -> Result<PendingExchange<'_, E, Signature>, Error<E::Error>> {
        let command = commands::sign_data(account_number, data)?;
        debug!(
            "signing {}-byte blob with account {account_number}",
            data.len()
        );
        PendingExchange::new(self, command, responses::decode_signature)
    }

    /// Sign an opaque blob, driving the on-device confirmation through
    /// `user_action`.
    ///
    /// The device signs the raw bytes directly, without any hashing layer.
    pub async fn sign_data<A, F>(
        &self,
        account_number: u32,
        data: &[u8],
        user_action: A,
    ) -> Result<Signature, Error<E::Error>>
    where
        A: FnOnce() -> F,
        F: Future<Output = ()>,
    {
        self.begin_sign_data(account_number, data)?
            .confirm_with(user_action)
            .await
    }

    /// Request a signature over a spend transaction
    pub fn begin_sign_transaction(
        &self,
        account_number: u32,
        inner_tx: bool,
        network_id: &[u8],
        transaction: &Transaction,
    ) -> Result<PendingExchange<'_, E, Signature>, Error<E::Error>> {
        let command =
            commands::sign_transaction(account_number, inner_tx, network_id, transaction)?;
        debug!(
            "signing transaction with account {account_number}, nonce {}, inner: {inner_tx}",
            transaction.nonce
        );
        PendingExchange::new(self, command, responses::decode_signature)
    }

    /// Sign a spend transaction, driving the on-device confirmation through
    /// `user_action`.
    ///
    /// The device signs `network_id || BLAKE2b-256(rlp(tx))` (with the
    /// inner-transaction marker spliced in when `inner_tx` is set),
    /// reproducible with [`preimage::for_transaction`].
    pub async fn sign_transaction<A, F>(
        &self,
        account_number: u32,
        inner_tx: bool,
        network_id: &[u8],
        transaction: &Transaction,
        user_action: A,
    ) -> Result<Signature, Error<E::Error>>
    where
        A: FnOnce() -> F,
        F: Future<Output = ()>,
    {
        self.begin_sign_transaction(account_number, inner_tx, network_id, transaction)?
            .confirm_with(user_action)
            .await
    }

    /// The raw answer of the most recently resolved confirmation exchange
    pub fn last_response(&self) -> Option<ApduAnswer> {
        // Poisoning would need a panic while the slot is held in resolve()
        self.last_answer.lock().unwrap().clone()
    }

    async fn request(&self, command: ApduCommand) -> Result<Vec<u8>, Error<E::Error>> {
        if self.exchange_in_flight.load(Ordering::Acquire) {
            return Err(Error::ExchangeInProgress);
        }
        let answer = self
            .transport
            .exchange(command)
            .await
            .map_err(Error::Transport)?;
        payload_of(answer)
    }
}

/// Extract the success payload or surface the status word as a typed failure
pub(crate) fn payload_of<E: std::error::Error>(answer: ApduAnswer) -> Result<Vec<u8>, Error<E>> {
    match answer.status() {
        StatusWord::Ok => Ok(answer.data),
        status => Err(Error::Device {
            status,
            data: answer.data,
        }),
    }
}
