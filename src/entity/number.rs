// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Export limit setpoint in watts.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

use super::listener::spawn_listener;
use crate::client::DeviceSession;
use crate::error::{Result, ValueError};
use crate::event::{EntityId, EntityState, Event, EventBus};
use crate::types::DeviceUnits;

#[derive(Debug, Clone, Copy)]
struct NumberState {
    /// Displayed setpoint, kept in device units so it stays on the 10 W grid.
    value: DeviceUnits,
    /// Last known state of the sibling switch.
    is_switch_on: bool,
}

/// Setpoint for the export limit, in watts.
///
/// The setpoint can always be edited, even while the switch is off, so a
/// value can be staged before the limit is enabled. It is only written to the
/// inverter while the sibling [`ExportLimitSwitch`](super::ExportLimitSwitch)
/// is known to be on.
///
/// # Examples
///
/// ```
/// use sungrow_export_limit::client::{DeviceSession, SimulatedInverter};
/// use sungrow_export_limit::entity::ExportLimitNumber;
/// use sungrow_export_limit::event::EventBus;
/// use sungrow_export_limit::types::DeviceUnits;
///
/// # #[tokio::main]
/// # async fn main() -> sungrow_export_limit::Result<()> {
/// let inverter = SimulatedInverter::new("A2231234567");
/// let session = DeviceSession::new("192.168.1.20", Box::new(inverter.clone()));
/// let number = ExportLimitNumber::new(session, EventBus::new(), DeviceUnits::new(100));
///
/// // Switch is off: the value is staged, nothing is written
/// number.set_value(2500.0).await?;
/// assert!((number.native_value() - 2500.0).abs() < f64::EPSILON);
/// assert!(inverter.calls().is_empty());
///
/// assert!(number.set_value(60_000.0).await.is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ExportLimitNumber {
    id: EntityId,
    peer_id: EntityId,
    session: DeviceSession,
    bus: EventBus,
    state: RwLock<NumberState>,
    commands: Mutex<()>,
}

impl ExportLimitNumber {
    /// Smallest accepted setpoint in watts.
    pub const MIN_WATTS: f64 = 10.0;
    /// Largest accepted setpoint in watts.
    pub const MAX_WATTS: f64 = 50_000.0;
    /// Setpoint resolution in watts.
    pub const STEP_WATTS: f64 = 10.0;
    /// Unit of measurement of the value.
    pub const UNIT: &'static str = "W";
    /// Icon of the entity.
    pub const ICON: &'static str = "mdi:transmission-tower-export";

    /// Creates a number showing `initial_limit`, assuming the switch is off.
    #[must_use]
    pub fn new(session: DeviceSession, bus: EventBus, initial_limit: DeviceUnits) -> Self {
        let id = EntityId::number(session.host());
        let peer_id = id.peer();

        Self {
            id,
            peer_id,
            session,
            bus,
            state: RwLock::new(NumberState {
                value: initial_limit,
                is_switch_on: false,
            }),
            commands: Mutex::new(()),
        }
    }

    /// Returns the entity identifier.
    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        &self.id
    }

    /// Returns the unique identifier, `<host>_export_limit_number`.
    #[must_use]
    pub fn unique_id(&self) -> String {
        self.id.to_string()
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> String {
        format!("Sungrow Export Limit Value ({})", self.id.host())
    }

    /// Returns the setpoint in watts.
    #[must_use]
    pub fn native_value(&self) -> f64 {
        self.state.read().value.to_watts()
    }

    /// Returns the last known state of the sibling switch.
    #[must_use]
    pub fn is_switch_on(&self) -> bool {
        self.state.read().is_switch_on
    }

    /// The setpoint stays editable whatever the inverter or switch state.
    #[must_use]
    pub fn available(&self) -> bool {
        true
    }

    /// Returns the icon.
    #[must_use]
    pub fn icon(&self) -> &'static str {
        Self::ICON
    }

    /// Returns the observable state.
    ///
    /// `on_device` is `false`: a snapshot does not claim the inverter holds
    /// this value.
    #[must_use]
    pub fn state(&self) -> EntityState {
        EntityState::Number {
            value_watts: self.native_value(),
            on_device: false,
        }
    }

    /// Sets the export limit in watts.
    ///
    /// The value is truncated to the 10 W grid. While the switch is on it is
    /// written to the inverter first; the displayed value is updated in both
    /// cases. A state change is published on every successful call, even if
    /// the value is unchanged, so the switch always adopts it.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` for values outside
    /// `[MIN_WATTS, MAX_WATTS]` (without calling the inverter), or the client
    /// error if the write fails, in which case the value is unchanged.
    pub async fn set_value(&self, watts: f64) -> Result<()> {
        if !(Self::MIN_WATTS..=Self::MAX_WATTS).contains(&watts) {
            return Err(ValueError::OutOfRange {
                min: Self::MIN_WATTS,
                max: Self::MAX_WATTS,
                actual: watts,
            }
            .into());
        }

        let _guard = self.commands.lock().await;
        let limit = DeviceUnits::from_watts(watts);
        let switch_on = self.is_switch_on();

        if switch_on {
            self.session.set_export_limit(limit).await?;
        }
        self.update(Some(limit), None);
        self.publish(switch_on);
        Ok(())
    }

    /// Reads the enforced limit back from the inverter.
    ///
    /// A non-zero reading becomes the displayed value and marks the switch
    /// as on. A zero reading marks the switch as off and keeps the displayed
    /// value.
    ///
    /// # Errors
    ///
    /// Returns the client error if the read fails; state is left unchanged.
    pub async fn refresh(&self) -> Result<()> {
        let _guard = self.commands.lock().await;
        let reading = self.session.current_export_limit().await?;

        tracing::trace!(entity_id = %self.id, %reading, "Refreshed number");
        if reading.is_disabled() {
            self.update(None, Some(false));
        } else if self.update(Some(reading), Some(true)) {
            self.publish(true);
        }
        Ok(())
    }

    /// Applies an event from the bus.
    ///
    /// Only state changes of the sibling switch are considered; they update
    /// the cached switch state and never call the inverter.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub async fn handle_event(&self, event: &Event) -> Result<()> {
        if !event.is_from(&self.peer_id) {
            return Ok(());
        }
        let Some(EntityState::Switch { is_on }) = event.new_state() else {
            return Ok(());
        };

        let _guard = self.commands.lock().await;
        tracing::debug!(entity_id = %self.id, is_on, "Switch state changed");
        self.update(None, Some(is_on));
        Ok(())
    }

    /// Spawns the task that feeds bus events to [`handle_event`](Self::handle_event).
    pub(crate) fn spawn_listener(self: &Arc<Self>, rx: broadcast::Receiver<Event>) -> JoinHandle<()> {
        let number = Arc::clone(self);
        spawn_listener(self.id.clone(), rx, move |event| {
            let number = Arc::clone(&number);
            async move { number.handle_event(&event).await }
        })
    }

    /// Updates local state; returns `true` if the displayed value changed.
    fn update(&self, value: Option<DeviceUnits>, is_switch_on: Option<bool>) -> bool {
        let mut state = self.state.write();
        let old = state.value;
        if let Some(value) = value {
            state.value = value;
        }
        if let Some(is_on) = is_switch_on {
            state.is_switch_on = is_on;
        }
        old != state.value
    }

    /// Publishes the displayed value.
    fn publish(&self, on_device: bool) {
        let value_watts = self.native_value();
        tracing::debug!(entity_id = %self.id, value_watts, on_device, "Setpoint published");
        self.bus.publish(Event::state_changed(
            self.id.clone(),
            EntityState::Number {
                value_watts,
                on_device,
            },
        ));
    }
}
