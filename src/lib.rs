// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sungrow Export Limit - control the grid export limit of Sungrow inverters.
//!
//! Each configured inverter is exposed as two entities:
//!
//! - a **switch** that enforces or removes the export limit
//! - a **number** holding the limit in watts (10 to 50 000, step 10)
//!
//! The entities keep each other in sync through an [`EventBus`]. Calls to
//! the inverter client are blocking and run off the async executor.
//!
//! # Quick Start
//!
//! ```no_run
//! use sungrow_export_limit::client::{BoxedClient, SimulatedInverter};
//! use sungrow_export_limit::manager::ExportLimitManager;
//! use sungrow_export_limit::setup::{FlowResult, UserInput};
//! use sungrow_export_limit::types::CommunicationMode;
//!
//! #[tokio::main]
//! async fn main() -> sungrow_export_limit::Result<()> {
//!     // Any `Fn(&str, CommunicationMode) -> BoxedClient` builds clients
//!     let manager = ExportLimitManager::new(|_host: &str, _mode: CommunicationMode| -> BoxedClient {
//!         Box::new(SimulatedInverter::new("A2231234567"))
//!     });
//!
//!     let result = manager
//!         .configure(Some(UserInput::new("192.168.1.20", 3000).with_mode("modbus")))
//!         .await?;
//!
//!     match result {
//!         FlowResult::CreateEntry { entry, .. } => {
//!             // Persist `entry.to_json()?` to restore it on the next start
//!             manager.set_value(entry.entry_id, 2500.0).await?;
//!             manager.turn_on(entry.entry_id).await?;
//!         }
//!         FlowResult::ShowForm { errors } => println!("invalid input: {errors:?}"),
//!         FlowResult::Abort { reason } => println!("aborted: {reason}"),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Using the Entities Directly
//!
//! ```no_run
//! use sungrow_export_limit::client::{DeviceSession, SimulatedInverter};
//! use sungrow_export_limit::entity::{ExportLimitNumber, ExportLimitSwitch};
//! use sungrow_export_limit::event::EventBus;
//! use sungrow_export_limit::types::DeviceUnits;
//!
//! # async fn example() -> sungrow_export_limit::Result<()> {
//! let bus = EventBus::new();
//! let session = DeviceSession::new("192.168.1.20", Box::new(SimulatedInverter::new("SN")));
//!
//! let switch = ExportLimitSwitch::new(session.clone(), bus.clone(), DeviceUnits::new(50));
//! let number = ExportLimitNumber::new(session, bus, DeviceUnits::new(50));
//!
//! switch.refresh().await?;
//! number.refresh().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod entity;
pub mod error;
pub mod event;
pub mod manager;
pub mod setup;
pub mod types;

pub use client::{BoxedClient, Connector, DeviceSession, InverterClient, SimulatedInverter};
pub use entity::{ExportLimitNumber, ExportLimitSwitch};
pub use error::{Error, ParseError, ProtocolError, Result, SetupError, ValueError};
pub use event::{EntityId, EntityKind, EntityState, EntryId, Event, EventBus};
pub use manager::{ExportLimitManager, IntegrationConfig};
pub use setup::{ConfigEntry, ConfigFlow, EntryData, FlowResult, UserInput};
pub use types::{CommunicationMode, DeviceUnits};
