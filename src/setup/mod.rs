// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inverter setup and persisted configuration.
//!
//! [`ConfigFlow`] turns a [`UserInput`] form into a [`ConfigEntry`] after
//! checking the schema and probing the inverter. Entries serialize to JSON
//! so callers can persist them and restore them with
//! [`ExportLimitManager::add_entry`](crate::manager::ExportLimitManager::add_entry).

mod config_entry;
mod config_flow;
mod user_input;

pub use config_entry::{ConfigEntry, ENTRY_TITLE, EntryData};
pub use config_flow::{ALREADY_CONFIGURED, BASE_ERROR_KEY, ConfigFlow, FlowResult};
pub use user_input::{MAX_SETUP_LIMIT_WATTS, MIN_SETUP_LIMIT_WATTS, UserInput};
