// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event types carried by the synchronization bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, EntryId};

/// Observable state of an entity, as published on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityState {
    /// State of the export limit switch.
    Switch {
        /// Whether an export limit is enforced.
        is_on: bool,
    },

    /// State of the export limit setpoint.
    Number {
        /// The setpoint in watts.
        value_watts: f64,
        /// `true` if this value is already enforced on the inverter, either
        /// because the number wrote it or because it was read back from it.
        on_device: bool,
    },
}

/// Events published on the [`EventBus`](super::EventBus).
///
/// # Examples
///
/// ```
/// use sungrow_export_limit::event::{EntityId, EntityState, Event};
///
/// let event = Event::state_changed(
///     EntityId::switch("192.168.1.20"),
///     EntityState::Switch { is_on: true },
/// );
///
/// assert!(event.is_from(&EntityId::switch("192.168.1.20")));
/// assert!(!event.is_from(&EntityId::switch("192.168.1.21")));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A config entry was set up.
    EntryAdded {
        /// The new entry.
        entry_id: EntryId,
    },

    /// A config entry was removed.
    EntryRemoved {
        /// The removed entry.
        entry_id: EntryId,
    },

    /// An entity's observable state changed.
    StateChanged {
        /// The entity that changed.
        entity_id: EntityId,
        /// Its new state.
        new_state: EntityState,
        /// When the change was published.
        changed_at: DateTime<Utc>,
    },
}

impl Event {
    /// Creates a state changed event stamped with the current time.
    #[must_use]
    pub fn state_changed(entity_id: EntityId, new_state: EntityState) -> Self {
        Self::StateChanged {
            entity_id,
            new_state,
            changed_at: Utc::now(),
        }
    }

    /// Creates an entry added event.
    #[must_use]
    pub fn entry_added(entry_id: EntryId) -> Self {
        Self::EntryAdded { entry_id }
    }

    /// Creates an entry removed event.
    #[must_use]
    pub fn entry_removed(entry_id: EntryId) -> Self {
        Self::EntryRemoved { entry_id }
    }

    /// Returns the emitting entity for state changes.
    #[must_use]
    pub fn entity_id(&self) -> Option<&EntityId> {
        match self {
            Self::StateChanged { entity_id, .. } => Some(entity_id),
            Self::EntryAdded { .. } | Self::EntryRemoved { .. } => None,
        }
    }

    /// Returns `true` if this is a state change emitted by `entity_id`.
    #[must_use]
    pub fn is_from(&self, entity_id: &EntityId) -> bool {
        self.entity_id() == Some(entity_id)
    }

    /// Returns the new state if this is a state change.
    #[must_use]
    pub fn new_state(&self) -> Option<EntityState> {
        match self {
            Self::StateChanged { new_state, .. } => Some(*new_state),
            Self::EntryAdded { .. } | Self::EntryRemoved { .. } => None,
        }
    }

    /// Returns `true` if this is an entry lifecycle event.
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::EntryAdded { .. } | Self::EntryRemoved { .. })
    }
}
