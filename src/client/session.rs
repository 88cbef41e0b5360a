// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Async session wrapping a blocking inverter client.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{BoxedClient, InverterClient};
use crate::error::ProtocolError;
use crate::types::DeviceUnits;

/// Shared, async handle to one inverter.
///
/// The session owns the client behind a mutex, so every call to the same
/// device is serialized no matter which entity issues it. Each call runs on
/// tokio's blocking pool and is bounded by the session timeout.
///
/// Cloning a session is cheap and shares the underlying client.
///
/// # Timeouts
///
/// A timed-out call returns [`ProtocolError::Timeout`] to the caller, but the
/// blocking thread keeps running until the client returns; later calls wait
/// for it to release the client. While a client hangs, each new call parks
/// one more blocking thread on the session mutex. Background callers should
/// check [`is_busy`](Self::is_busy) and skip their turn instead.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use sungrow_export_limit::client::{DeviceSession, SimulatedInverter};
/// use sungrow_export_limit::types::DeviceUnits;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), sungrow_export_limit::error::ProtocolError> {
/// let inverter = SimulatedInverter::new("A2231234567");
/// let session = DeviceSession::new("192.168.1.20", Box::new(inverter.clone()))
///     .with_timeout(Duration::from_secs(5));
///
/// session.set_export_limit(DeviceUnits::new(300)).await?;
/// assert_eq!(session.current_export_limit().await?.value(), 300);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DeviceSession {
    host: Arc<str>,
    client: Arc<Mutex<BoxedClient>>,
    timeout: Duration,
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("host", &self.host)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DeviceSession {
    /// Default per-call timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a session for the given host and client.
    #[must_use]
    pub fn new(host: impl Into<String>, client: BoxedClient) -> Self {
        let host: String = host.into();
        Self {
            host: Arc::from(host),
            client: Arc::new(Mutex::new(client)),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the inverter host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns `true` while a client call holds the client, including a call
    /// that already timed out but has not returned yet.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.client.is_locked()
    }

    /// Returns the per-call timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Connects to the inverter.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the client fails or the call times out.
    pub async fn connect(&self) -> Result<bool, ProtocolError> {
        self.call("connect", |client| client.connect()).await
    }

    /// Reads the inverter serial number.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the client fails or the call times out.
    pub async fn device_serial_number(&self) -> Result<String, ProtocolError> {
        self.call("device_serial_number", |client| {
            client.device_serial_number()
        })
        .await
    }

    /// Enables the export limit.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the client fails or the call times out.
    pub async fn set_export_limit(&self, limit: DeviceUnits) -> Result<(), ProtocolError> {
        tracing::debug!(host = %self.host, %limit, "Setting export limit");
        self.call("set_export_limit", move |client| {
            client.set_export_limit(limit)
        })
        .await
    }

    /// Disables the export limit.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the client fails or the call times out.
    pub async fn unset_export_limit(&self) -> Result<(), ProtocolError> {
        tracing::debug!(host = %self.host, "Unsetting export limit");
        self.call("unset_export_limit", |client| client.unset_export_limit())
            .await
    }

    /// Reads the currently enforced export limit.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the client fails or the call times out.
    pub async fn current_export_limit(&self) -> Result<DeviceUnits, ProtocolError> {
        self.call("current_export_limit", |client| {
            client.current_export_limit()
        })
        .await
    }

    /// Runs a client call on the blocking pool, bounded by the timeout.
    async fn call<T, F>(&self, operation: &'static str, f: F) -> Result<T, ProtocolError>
    where
        T: Send + 'static,
        F: FnOnce(&mut BoxedClient) -> Result<T, ProtocolError> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        let task = tokio::task::spawn_blocking(move || {
            let mut guard = client.lock();
            f(&mut guard)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => {
                if let Err(e) = &result {
                    tracing::debug!(host = %self.host, operation, error = %e, "Client call failed");
                }
                result
            }
            Ok(Err(join_error)) => Err(ProtocolError::TaskFailed(join_error.to_string())),
            Err(_) => {
                let millis = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(host = %self.host, operation, millis, "Client call timed out");
                Err(ProtocolError::Timeout(millis))
            }
        }
    }
}
