// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory inverter used for tests and dry runs.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::InverterClient;
use crate::error::ProtocolError;
use crate::types::DeviceUnits;

/// A call received by a [`SimulatedInverter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCall {
    /// `connect()`
    Connect,
    /// `device_serial_number()`
    DeviceSerialNumber,
    /// `set_export_limit(limit)`
    SetExportLimit(DeviceUnits),
    /// `unset_export_limit()`
    UnsetExportLimit,
    /// `current_export_limit()`
    CurrentExportLimit,
}

impl ClientCall {
    /// Returns `true` for calls that change the inverter configuration.
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self, Self::SetExportLimit(_) | Self::UnsetExportLimit)
    }
}

#[derive(Debug)]
struct SimulatedState {
    serial: String,
    limit: DeviceUnits,
    reachable: bool,
    reject_auth: bool,
    failing: bool,
    delay: Option<Duration>,
    calls: Vec<ClientCall>,
}

/// An inverter that lives in memory.
///
/// Every call is recorded, in order, including calls that fail. Clones share
/// the same state, so a test can keep one handle while the session owns
/// another.
///
/// # Examples
///
/// ```
/// use sungrow_export_limit::client::{ClientCall, InverterClient, SimulatedInverter};
/// use sungrow_export_limit::types::DeviceUnits;
///
/// let inverter = SimulatedInverter::new("A2231234567");
/// let mut client = inverter.clone();
///
/// client.set_export_limit(DeviceUnits::new(300)).unwrap();
///
/// assert_eq!(inverter.limit(), DeviceUnits::new(300));
/// assert_eq!(
///     inverter.calls(),
///     vec![ClientCall::SetExportLimit(DeviceUnits::new(300))]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedInverter {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedInverter {
    /// Creates a reachable inverter with no limit enforced.
    #[must_use]
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimulatedState {
                serial: serial.into(),
                limit: DeviceUnits::ZERO,
                reachable: true,
                reject_auth: false,
                failing: false,
                delay: None,
                calls: Vec::new(),
            })),
        }
    }

    /// Sets the limit the inverter currently enforces, without recording a call.
    pub fn set_limit(&self, limit: DeviceUnits) {
        self.state.lock().limit = limit;
    }

    /// Returns the limit the inverter currently enforces.
    #[must_use]
    pub fn limit(&self) -> DeviceUnits {
        self.state.lock().limit
    }

    /// Makes `connect()` report the host as unreachable.
    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().reachable = reachable;
    }

    /// Makes `connect()` fail with [`ProtocolError::AuthenticationFailed`].
    pub fn set_reject_auth(&self, reject: bool) {
        self.state.lock().reject_auth = reject;
    }

    /// Makes every call fail with [`ProtocolError::ConnectionFailed`].
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    /// Delays every call by the given duration.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }

    /// Returns every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ClientCall> {
        self.state.lock().calls.clone()
    }

    /// Returns only the calls that change the inverter configuration.
    #[must_use]
    pub fn write_calls(&self) -> Vec<ClientCall> {
        self.state
            .lock()
            .calls
            .iter()
            .copied()
            .filter(ClientCall::is_write)
            .collect()
    }

    /// Forgets all recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Records the call and applies the configured delay and failure mode.
    fn begin(&self, call: ClientCall) -> Result<(), ProtocolError> {
        let (delay, failing) = {
            let mut state = self.state.lock();
            state.calls.push(call);
            (state.delay, state.failing)
        };

        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        if failing {
            return Err(ProtocolError::ConnectionFailed(
                "simulated inverter is failing".to_string(),
            ));
        }
        Ok(())
    }
}

impl InverterClient for SimulatedInverter {
    fn connect(&mut self) -> Result<bool, ProtocolError> {
        self.begin(ClientCall::Connect)?;
        let state = self.state.lock();
        if state.reject_auth {
            return Err(ProtocolError::AuthenticationFailed);
        }
        Ok(state.reachable)
    }

    fn device_serial_number(&mut self) -> Result<String, ProtocolError> {
        self.begin(ClientCall::DeviceSerialNumber)?;
        Ok(self.state.lock().serial.clone())
    }

    fn set_export_limit(&mut self, limit: DeviceUnits) -> Result<(), ProtocolError> {
        self.begin(ClientCall::SetExportLimit(limit))?;
        self.state.lock().limit = limit;
        Ok(())
    }

    fn unset_export_limit(&mut self) -> Result<(), ProtocolError> {
        self.begin(ClientCall::UnsetExportLimit)?;
        self.state.lock().limit = DeviceUnits::ZERO;
        Ok(())
    }

    fn current_export_limit(&mut self) -> Result<DeviceUnits, ProtocolError> {
        self.begin(ClientCall::CurrentExportLimit)?;
        Ok(self.state.lock().limit)
    }
}
