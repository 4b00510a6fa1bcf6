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
//! Two-phase exchanges gated on an on-device user decision
//!
//! Commands that bring up a confirmation screen do not produce a result until
//! the user approves or rejects on the device. That window is modelled as an
//! explicit handle: `begin_*` dispatches the command and returns a
//! [`PendingExchange`], the caller performs whatever drives the decision
//! (walking a simulator UI, or simply waiting for a human), and
//! [`resolve`](PendingExchange::resolve) collects the terminal answer. Only
//! one exchange may be outstanding per app handle at a time.

use std::future::Future;
use std::sync::atomic::Ordering;

use futures::future::BoxFuture;
use log::debug;

use crate::responses::DecodeError;
use crate::transport::{ApduAnswer, ApduCommand, Exchange};
use crate::{payload_of, AeternityApp, Error};

/// An in-flight exchange awaiting the user's on-device decision.
///
/// Dropping the handle without resolving abandons the exchange and releases
/// the outstanding-exchange lock, so a failure in caller code between `begin`
/// and `resolve` cannot wedge the app handle.
pub struct PendingExchange<'a, E: Exchange, T> {
    app: &'a AeternityApp<E>,
    exchange: Option<BoxFuture<'a, Result<ApduAnswer, E::Error>>>,
    decode: fn(&[u8]) -> Result<T, DecodeError>,
}

impl<'a, E: Exchange, T> PendingExchange<'a, E, T> {
    pub(crate) fn new(
        app: &'a AeternityApp<E>,
        command: ApduCommand,
        decode: fn(&[u8]) -> Result<T, DecodeError>,
    ) -> Result<Self, Error<E::Error>> {
        if app.exchange_in_flight.swap(true, Ordering::Acquire) {
            return Err(Error::ExchangeInProgress);
        }

        let transport = &app.transport;
        let exchange: BoxFuture<'a, Result<ApduAnswer, E::Error>> =
            Box::pin(async move { transport.exchange(command).await });

        Ok(PendingExchange {
            app,
            exchange: Some(exchange),
            decode,
        })
    }

    /// Collect the terminal answer and decode the typed result.
    ///
    /// The raw answer, success or not, is stored in the app's last-response
    /// slot before any status checking happens.
    pub async fn resolve(mut self) -> Result<T, Error<E::Error>> {
        // Set in new() and taken exactly once; resolve consumes self
        let exchange = self.exchange.take().unwrap();

        let answer = exchange.await.map_err(Error::Transport)?;
        debug!("confirmation exchange resolved with status {}", answer.status());

        // Poisoning would need a panic while the slot is held below
        *self.app.last_answer.lock().unwrap() = Some(answer.clone());

        let payload = payload_of(answer)?;
        Ok((self.decode)(&payload)?)
    }

    /// Scoped confirmation: run `user_action` to drive the approval or
    /// rejection, then resolve.
    ///
    /// The action is expected to cause exactly one externally observable
    /// decision; the exchange is resolved (or, on panic, abandoned and
    /// unlocked) on every exit path.
    pub async fn confirm_with<A, F>(self, user_action: A) -> Result<T, Error<E::Error>>
    where
        A: FnOnce() -> F,
        F: Future<Output = ()>,
    {
        user_action().await;
        self.resolve().await
    }
}

impl<'a, E: Exchange, T> Drop for PendingExchange<'a, E, T> {
    fn drop(&mut self) {
        self.app.exchange_in_flight.store(false, Ordering::Release);
    }
}
