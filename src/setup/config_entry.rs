// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persisted configuration of one inverter.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::event::EntryId;
use crate::types::{CommunicationMode, DeviceUnits};

/// Title given to every entry.
pub const ENTRY_TITLE: &str = "Sungrow Export Limit";

/// Limit used when persisted data predates the `export_limit` field.
const DEFAULT_EXPORT_LIMIT: DeviceUnits = DeviceUnits::new(50);

fn default_export_limit() -> DeviceUnits {
    DEFAULT_EXPORT_LIMIT
}

/// Validated user configuration, as persisted.
///
/// `export_limit` is stored in device units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryData {
    /// Inverter host name or IP address.
    pub host: String,
    /// Initial export limit in device units.
    #[serde(default = "default_export_limit")]
    pub export_limit: DeviceUnits,
    /// Transport used by the inverter client.
    #[serde(default)]
    pub mode: CommunicationMode,
}

/// A configured inverter.
///
/// Entries are immutable: changing the configuration means removing the
/// entry and running setup again.
///
/// # Examples
///
/// ```
/// use sungrow_export_limit::setup::ConfigEntry;
///
/// let json = r#"{
///     "entry_id": "a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8",
///     "title": "Sungrow Export Limit",
///     "unique_id": "A2231234567",
///     "data": { "host": "192.168.1.20", "export_limit": 300, "mode": "modbus" }
/// }"#;
///
/// let entry = ConfigEntry::from_json(json).unwrap();
/// assert_eq!(entry.data.export_limit.value(), 300);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Identifier of this entry.
    pub entry_id: EntryId,
    /// Display title.
    pub title: String,
    /// Inverter serial number; at most one entry per serial.
    pub unique_id: String,
    /// Validated configuration.
    pub data: EntryData,
}

impl ConfigEntry {
    /// Creates a new entry with a fresh identifier.
    #[must_use]
    pub fn new(unique_id: impl Into<String>, data: EntryData) -> Self {
        Self {
            entry_id: EntryId::new(),
            title: ENTRY_TITLE.to_string(),
            unique_id: unique_id.into(),
            data,
        }
    }

    /// Returns the inverter host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.data.host
    }

    /// Serializes the entry to JSON.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, ParseError> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    /// Parses an entry from JSON.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if the JSON is malformed or incomplete.
    pub fn from_json(json: &str) -> Result<Self, ParseError> {
        serde_json::from_str(json).map_err(Into::into)
    }
}
