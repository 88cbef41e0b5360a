// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-qualified entity identifiers.
//!
//! Both entities of an inverter derive their identifier from the inverter
//! host, so each can compute its peer's identifier without holding a
//! reference to it. The string form is `<host>_export_limit_switch` or
//! `<host>_export_limit_number`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

const SWITCH_SUFFIX: &str = "_export_limit_switch";
const NUMBER_SUFFIX: &str = "_export_limit_number";

/// The two kinds of entity exposed per inverter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// On/off export limit switch.
    Switch,
    /// Export limit setpoint in watts.
    Number,
}

impl EntityKind {
    /// Returns the kind of the sibling entity.
    #[must_use]
    pub const fn peer(self) -> Self {
        match self {
            Self::Switch => Self::Number,
            Self::Number => Self::Switch,
        }
    }

    const fn suffix(self) -> &'static str {
        match self {
            Self::Switch => SWITCH_SUFFIX,
            Self::Number => NUMBER_SUFFIX,
        }
    }
}

/// Identifier of one entity, qualified by its inverter host.
///
/// # Examples
///
/// ```
/// use sungrow_export_limit::event::{EntityId, EntityKind};
///
/// let switch = EntityId::switch("192.168.1.20");
/// assert_eq!(switch.to_string(), "192.168.1.20_export_limit_switch");
/// assert_eq!(switch.peer(), EntityId::number("192.168.1.20"));
///
/// let parsed: EntityId = "192.168.1.20_export_limit_number".parse().unwrap();
/// assert_eq!(parsed.kind(), EntityKind::Number);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId {
    host: String,
    kind: EntityKind,
}

impl EntityId {
    /// Creates an identifier for the given host and kind.
    #[must_use]
    pub fn new(host: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            host: host.into(),
            kind,
        }
    }

    /// Identifier of the switch entity for a host.
    #[must_use]
    pub fn switch(host: impl Into<String>) -> Self {
        Self::new(host, EntityKind::Switch)
    }

    /// Identifier of the number entity for a host.
    #[must_use]
    pub fn number(host: impl Into<String>) -> Self {
        Self::new(host, EntityKind::Number)
    }

    /// Returns the inverter host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the entity kind.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns the identifier of the sibling entity on the same host.
    #[must_use]
    pub fn peer(&self) -> Self {
        Self::new(self.host.clone(), self.kind.peer())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.host, self.kind.suffix())
    }
}

impl FromStr for EntityId {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [EntityKind::Switch, EntityKind::Number]
            .into_iter()
            .find_map(|kind| {
                s.strip_suffix(kind.suffix())
                    .filter(|host| !host.is_empty())
                    .map(|host| Self::new(host, kind))
            })
            .ok_or_else(|| ValueError::InvalidEntityId(s.to_string()))
    }
}
