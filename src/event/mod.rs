// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Synchronization bus between the switch and number entities.
//!
//! Every entity publishes an [`Event::StateChanged`] whenever its observable
//! state changes, and listens for the events of its sibling on the same
//! inverter. Siblings find each other through host-qualified [`EntityId`]s;
//! any other event on the bus is ignored.
//!
//! The manager gives each inverter its own bus and republishes everything on
//! a public bus, next to the entry lifecycle events.
//!
//! # Examples
//!
//! ```
//! use sungrow_export_limit::event::{EntityId, EntityState, Event, EventBus};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! let switch = EntityId::switch("192.168.1.20");
//! bus.publish(Event::state_changed(switch.clone(), EntityState::Switch { is_on: true }));
//!
//! let event = rx.try_recv().unwrap();
//! assert!(event.is_from(&switch));
//! ```

mod entity_event;
mod entity_id;
mod entry_id;
mod event_bus;

pub use entity_event::{EntityState, Event};
pub use entity_id::{EntityId, EntityKind};
pub use entry_id::EntryId;
pub use event_bus::EventBus;
