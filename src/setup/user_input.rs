// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw setup form input and its schema.

use serde::Deserialize;

use super::EntryData;
use crate::error::ValueError;
use crate::types::{CommunicationMode, DeviceUnits};

/// Smallest export limit accepted at setup, in watts.
pub const MIN_SETUP_LIMIT_WATTS: i64 = 0;
/// Largest export limit accepted at setup, in watts.
pub const MAX_SETUP_LIMIT_WATTS: i64 = 500_000;

/// Setup form as submitted by the user.
///
/// Every field is optional here; [`UserInput::validate`] enforces the schema.
///
/// # Examples
///
/// ```
/// use sungrow_export_limit::setup::UserInput;
///
/// let input: UserInput = serde_json::from_str(
///     r#"{ "host": "192.168.1.20", "export_limit": 3000, "mode": "modbus" }"#,
/// ).unwrap();
///
/// let data = input.validate().unwrap();
/// assert_eq!(data.export_limit.value(), 300);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserInput {
    /// Inverter host name or IP address (required).
    #[serde(default)]
    pub host: Option<String>,
    /// Export limit in watts (required).
    #[serde(default)]
    pub export_limit: Option<i64>,
    /// `"http"` (default) or `"modbus"`.
    #[serde(default)]
    pub mode: Option<String>,
}

impl UserInput {
    /// Creates input with the required fields.
    #[must_use]
    pub fn new(host: impl Into<String>, export_limit_watts: i64) -> Self {
        Self {
            host: Some(host.into()),
            export_limit: Some(export_limit_watts),
            mode: None,
        }
    }

    /// Sets the communication mode.
    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Checks the input against the setup schema.
    ///
    /// The limit is converted from watts to device units.
    ///
    /// # Errors
    ///
    /// Returns the first failing field and its error.
    pub fn validate(&self) -> Result<EntryData, (&'static str, ValueError)> {
        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .ok_or(("host", ValueError::MissingField("host")))?;

        let watts = self
            .export_limit
            .ok_or(("export_limit", ValueError::MissingField("export_limit")))?;
        #[allow(clippy::cast_precision_loss)]
        let watts_f64 = watts as f64;
        if !(MIN_SETUP_LIMIT_WATTS..=MAX_SETUP_LIMIT_WATTS).contains(&watts) {
            return Err((
                "export_limit",
                ValueError::OutOfRange {
                    min: 0.0,
                    max: 500_000.0,
                    actual: watts_f64,
                },
            ));
        }

        let mode = match self.mode.as_deref() {
            None => CommunicationMode::default(),
            Some(mode) => mode.parse().map_err(|e| ("mode", e))?,
        };

        Ok(EntryData {
            host: host.to_string(),
            export_limit: DeviceUnits::from_watts(watts_f64),
            mode,
        })
    }
}
