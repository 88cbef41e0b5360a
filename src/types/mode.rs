// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Communication mode used by the inverter client.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Transport the inverter client should use to reach the device.
///
/// The transport itself lives in the client; this crate only forwards the
/// choice when constructing one.
///
/// # Examples
///
/// ```
/// use sungrow_export_limit::types::CommunicationMode;
///
/// let mode: CommunicationMode = "modbus".parse().unwrap();
/// assert_eq!(mode, CommunicationMode::Modbus);
/// assert_eq!(CommunicationMode::default().as_str(), "http");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationMode {
    /// HTTP.
    #[default]
    Http,
    /// Modbus TCP.
    Modbus,
}

impl CommunicationMode {
    /// Returns the persisted string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Modbus => "modbus",
        }
    }
}

impl fmt::Display for CommunicationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommunicationMode {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "modbus" => Ok(Self::Modbus),
            _ => Err(ValueError::InvalidMode(s.to_string())),
        }
    }
}
