// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inverter client abstraction.
//!
//! The actual device communication (HTTP or Modbus) is performed by an
//! external client that implements [`InverterClient`]. Clients are
//! synchronous and may block on network I/O, so they are never called
//! directly from async code: a [`DeviceSession`] runs every call on tokio's
//! blocking pool with a timeout.
//!
//! # Implementing a client
//!
//! ```
//! use sungrow_export_limit::client::InverterClient;
//! use sungrow_export_limit::error::ProtocolError;
//! use sungrow_export_limit::types::DeviceUnits;
//!
//! struct MyClient {
//!     host: String,
//!     limit: DeviceUnits,
//! }
//!
//! impl InverterClient for MyClient {
//!     fn connect(&mut self) -> Result<bool, ProtocolError> {
//!         Ok(!self.host.is_empty())
//!     }
//!
//!     fn device_serial_number(&mut self) -> Result<String, ProtocolError> {
//!         Ok("A2231234567".to_string())
//!     }
//!
//!     fn set_export_limit(&mut self, limit: DeviceUnits) -> Result<(), ProtocolError> {
//!         self.limit = limit;
//!         Ok(())
//!     }
//!
//!     fn unset_export_limit(&mut self) -> Result<(), ProtocolError> {
//!         self.limit = DeviceUnits::ZERO;
//!         Ok(())
//!     }
//!
//!     fn current_export_limit(&mut self) -> Result<DeviceUnits, ProtocolError> {
//!         Ok(self.limit)
//!     }
//! }
//! ```

mod session;
mod simulated;

pub use session::DeviceSession;
pub use simulated::{ClientCall, SimulatedInverter};

use crate::error::ProtocolError;
use crate::types::{CommunicationMode, DeviceUnits};

/// Blocking client for a single inverter.
///
/// All methods may block on network I/O.
pub trait InverterClient: Send + 'static {
    /// Opens the connection to the inverter.
    ///
    /// Returns `Ok(false)` if the inverter could not be reached.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` for failures other than an unreachable host,
    /// such as rejected credentials.
    fn connect(&mut self) -> Result<bool, ProtocolError>;

    /// Reads the inverter's serial number.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the request fails.
    fn device_serial_number(&mut self) -> Result<String, ProtocolError>;

    /// Enables the export limit with the given value.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the request fails.
    fn set_export_limit(&mut self, limit: DeviceUnits) -> Result<(), ProtocolError>;

    /// Disables the export limit.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the request fails.
    fn unset_export_limit(&mut self) -> Result<(), ProtocolError>;

    /// Reads the export limit currently enforced, zero when disabled.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the request fails.
    fn current_export_limit(&mut self) -> Result<DeviceUnits, ProtocolError>;
}

/// Boxed client as stored by a [`DeviceSession`].
pub type BoxedClient = Box<dyn InverterClient>;

/// Constructs inverter clients from a host and communication mode.
///
/// Implemented for any `Fn(&str, CommunicationMode) -> BoxedClient`.
///
/// # Examples
///
/// ```
/// use sungrow_export_limit::client::{BoxedClient, Connector, SimulatedInverter};
/// use sungrow_export_limit::types::CommunicationMode;
///
/// let inverter = SimulatedInverter::new("A2231234567");
/// let connector = move |_host: &str, _mode: CommunicationMode| -> BoxedClient {
///     Box::new(inverter.clone())
/// };
///
/// let _client = connector.create("192.168.1.20", CommunicationMode::Http);
/// ```
pub trait Connector: Send + Sync {
    /// Creates a new, not yet connected client.
    fn create(&self, host: &str, mode: CommunicationMode) -> BoxedClient;
}

impl<F> Connector for F
where
    F: Fn(&str, CommunicationMode) -> BoxedClient + Send + Sync,
{
    fn create(&self, host: &str, mode: CommunicationMode) -> BoxedClient {
        self(host, mode)
    }
}
