// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Manager for coordinating multiple inverters.
//!
//! The [`ExportLimitManager`] is the entry point for applications. It runs
//! the setup flow, owns one switch and one number per configured inverter,
//! and exposes the shared event bus.
//!
//! # Examples
//!
//! ## Restoring Persisted Entries
//!
//! ```no_run
//! use sungrow_export_limit::client::{BoxedClient, SimulatedInverter};
//! use sungrow_export_limit::manager::{ExportLimitManager, IntegrationConfig};
//! use sungrow_export_limit::setup::ConfigEntry;
//! use sungrow_export_limit::types::CommunicationMode;
//!
//! # async fn example(stored: Vec<String>) -> sungrow_export_limit::Result<()> {
//! let manager = ExportLimitManager::with_config(
//!     |_host: &str, _mode: CommunicationMode| -> BoxedClient {
//!         Box::new(SimulatedInverter::new("A2231234567"))
//!     },
//!     IntegrationConfig::new().without_polling(),
//! );
//!
//! for json in stored {
//!     let entry = ConfigEntry::from_json(&json)?;
//!     manager.add_entry(entry).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Event Subscription
//!
//! ```no_run
//! use sungrow_export_limit::event::{EntityState, Event};
//! # use sungrow_export_limit::manager::ExportLimitManager;
//!
//! # fn example(manager: &ExportLimitManager) {
//! let mut events = manager.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         if let Event::StateChanged { entity_id, new_state, .. } = event {
//!             match new_state {
//!                 EntityState::Switch { is_on } => println!("{entity_id}: on={is_on}"),
//!                 EntityState::Number { value_watts, .. } => println!("{entity_id}: {value_watts} W"),
//!             }
//!         }
//!     }
//! });
//! # }
//! ```

mod device_manager;
mod integration_config;
mod managed_device;

pub use device_manager::ExportLimitManager;
pub use integration_config::{DEFAULT_EVENT_CAPACITY, DEFAULT_POLL_INTERVAL, IntegrationConfig};
