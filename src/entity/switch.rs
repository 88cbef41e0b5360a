// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Export limit on/off switch.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

use super::listener::spawn_listener;
use crate::client::DeviceSession;
use crate::error::Result;
use crate::event::{EntityId, EntityState, Event, EventBus};
use crate::types::DeviceUnits;

#[derive(Debug, Clone, Copy)]
struct SwitchState {
    is_on: bool,
    /// Limit written to the inverter on `turn_on`, mirrored from the number.
    cached_limit: DeviceUnits,
}

/// Switch projecting "an export limit is enforced on the inverter".
///
/// Turning the switch on writes the cached limit to the inverter; turning it
/// off always unsets the limit rather than writing zero. The cached limit
/// follows the sibling [`ExportLimitNumber`](super::ExportLimitNumber)
/// through the event bus, and is re-applied immediately while the switch is
/// on.
///
/// Local state only changes after the inverter call succeeds.
///
/// # Examples
///
/// ```
/// use sungrow_export_limit::client::{ClientCall, DeviceSession, SimulatedInverter};
/// use sungrow_export_limit::entity::ExportLimitSwitch;
/// use sungrow_export_limit::event::EventBus;
/// use sungrow_export_limit::types::DeviceUnits;
///
/// # #[tokio::main]
/// # async fn main() -> sungrow_export_limit::Result<()> {
/// let inverter = SimulatedInverter::new("A2231234567");
/// let session = DeviceSession::new("192.168.1.20", Box::new(inverter.clone()));
/// let switch = ExportLimitSwitch::new(session, EventBus::new(), DeviceUnits::new(300));
///
/// switch.turn_on().await?;
/// assert!(switch.is_on());
/// assert_eq!(
///     inverter.calls(),
///     vec![ClientCall::SetExportLimit(DeviceUnits::new(300))]
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ExportLimitSwitch {
    id: EntityId,
    peer_id: EntityId,
    session: DeviceSession,
    bus: EventBus,
    state: RwLock<SwitchState>,
    /// Serializes commands and peer updates on this entity.
    commands: Mutex<()>,
}

impl ExportLimitSwitch {
    /// Icon shown while a limit is enforced.
    pub const ICON_ON: &'static str = "mdi:transmission-tower";
    /// Icon shown while no limit is enforced.
    pub const ICON_OFF: &'static str = "mdi:transmission-tower-off";

    /// Creates a switch in the off state.
    ///
    /// `initial_limit` is the limit written on the first `turn_on` unless
    /// the number entity or a refresh provides a newer one.
    #[must_use]
    pub fn new(session: DeviceSession, bus: EventBus, initial_limit: DeviceUnits) -> Self {
        let id = EntityId::switch(session.host());
        let peer_id = id.peer();

        Self {
            id,
            peer_id,
            session,
            bus,
            state: RwLock::new(SwitchState {
                is_on: false,
                cached_limit: initial_limit,
            }),
            commands: Mutex::new(()),
        }
    }

    /// Returns the entity identifier.
    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        &self.id
    }

    /// Returns the unique identifier, `<host>_export_limit_switch`.
    #[must_use]
    pub fn unique_id(&self) -> String {
        self.id.to_string()
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> String {
        format!("Sungrow Export Limit ({})", self.id.host())
    }

    /// Returns `true` if an export limit is enforced.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.state.read().is_on
    }

    /// Returns the limit that `turn_on` would write.
    #[must_use]
    pub fn cached_limit(&self) -> DeviceUnits {
        self.state.read().cached_limit
    }

    /// Returns the icon for the current state.
    #[must_use]
    pub fn icon(&self) -> &'static str {
        if self.is_on() {
            Self::ICON_ON
        } else {
            Self::ICON_OFF
        }
    }

    /// Returns the observable state.
    #[must_use]
    pub fn state(&self) -> EntityState {
        EntityState::Switch {
            is_on: self.is_on(),
        }
    }

    /// Enforces the cached limit on the inverter.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the cached limit cannot be written
    /// to the inverter, or the client error if the call fails. The switch
    /// stays off on error.
    pub async fn turn_on(&self) -> Result<()> {
        let _guard = self.commands.lock().await;
        let limit = self.cached_limit().validate_limit()?;

        self.session.set_export_limit(limit).await?;
        self.update(|state| state.is_on = true);
        Ok(())
    }

    /// Removes the export limit from the inverter.
    ///
    /// # Errors
    ///
    /// Returns the client error if the call fails. The switch stays on on
    /// error.
    pub async fn turn_off(&self) -> Result<()> {
        let _guard = self.commands.lock().await;

        self.session.unset_export_limit().await?;
        self.update(|state| state.is_on = false);
        Ok(())
    }

    /// Reads the enforced limit back from the inverter.
    ///
    /// A non-zero reading turns the switch on and replaces the cached limit.
    /// A zero reading turns it off and keeps the cached limit, so the last
    /// setpoint survives a disabled limit.
    ///
    /// # Errors
    ///
    /// Returns the client error if the read fails; state is left unchanged.
    pub async fn refresh(&self) -> Result<()> {
        let _guard = self.commands.lock().await;
        let reading = self.session.current_export_limit().await?;

        tracing::trace!(entity_id = %self.id, %reading, "Refreshed switch");
        self.update(|state| {
            if reading.is_disabled() {
                state.is_on = false;
            } else {
                state.is_on = true;
                state.cached_limit = reading;
            }
        });
        Ok(())
    }

    /// Applies an event from the bus.
    ///
    /// Only state changes of the sibling number are considered. The new
    /// setpoint replaces the cached limit and, while the switch is on, is
    /// written to the inverter unless the number already did so.
    ///
    /// # Errors
    ///
    /// Returns an error if re-applying the limit fails. The cached limit is
    /// updated regardless.
    pub async fn handle_event(&self, event: &Event) -> Result<()> {
        if !event.is_from(&self.peer_id) {
            return Ok(());
        }
        let Some(EntityState::Number {
            value_watts,
            on_device,
        }) = event.new_state()
        else {
            return Ok(());
        };

        let _guard = self.commands.lock().await;
        let limit = DeviceUnits::from_watts(value_watts);
        let is_on = {
            let mut state = self.state.write();
            state.cached_limit = limit;
            state.is_on
        };

        tracing::debug!(entity_id = %self.id, %limit, is_on, on_device, "Setpoint changed");

        if is_on && !on_device {
            self.session
                .set_export_limit(limit.validate_limit()?)
                .await?;
        }
        Ok(())
    }

    /// Spawns the task that feeds bus events to [`handle_event`](Self::handle_event).
    pub(crate) fn spawn_listener(self: &Arc<Self>, rx: broadcast::Receiver<Event>) -> JoinHandle<()> {
        let switch = Arc::clone(self);
        spawn_listener(self.id.clone(), rx, move |event| {
            let switch = Arc::clone(&switch);
            async move { switch.handle_event(&event).await }
        })
    }

    /// Mutates local state and publishes if `is_on` changed.
    fn update(&self, mutate: impl FnOnce(&mut SwitchState)) {
        let (was_on, is_on) = {
            let mut state = self.state.write();
            let was_on = state.is_on;
            mutate(&mut *state);
            (was_on, state.is_on)
        };

        if was_on != is_on {
            tracing::debug!(entity_id = %self.id, is_on, "Switch state changed");
            self.bus
                .publish(Event::state_changed(self.id.clone(), EntityState::Switch { is_on }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientCall, SimulatedInverter};
    use crate::error::{Error, ProtocolError, ValueError};

    const HOST: &str = "10.0.0.1";

    fn setup(limit: u32) -> (SimulatedInverter, EventBus, ExportLimitSwitch) {
        let inverter = SimulatedInverter::new("SN1");
        let bus = EventBus::new();
        let session = DeviceSession::new(HOST, Box::new(inverter.clone()));
        let switch = ExportLimitSwitch::new(session, bus.clone(), DeviceUnits::new(limit));
        (inverter, bus, switch)
    }

    fn number_event(host: &str, value_watts: f64, on_device: bool) -> Event {
        Event::state_changed(
            EntityId::number(host),
            EntityState::Number {
                value_watts,
                on_device,
            },
        )
    }

    #[test]
    fn starts_off_with_identity_from_host() {
        let (_, _, switch) = setup(300);
        assert!(!switch.is_on());
        assert_eq!(switch.unique_id(), "10.0.0.1_export_limit_switch");
        assert_eq!(switch.name(), "Sungrow Export Limit (10.0.0.1)");
        assert_eq!(switch.icon(), ExportLimitSwitch::ICON_OFF);
    }

    #[tokio::test]
    async fn turn_on_writes_cached_limit_once() {
        let (inverter, bus, switch) = setup(300);
        let mut rx = bus.subscribe();

        switch.turn_on().await.unwrap();

        assert!(switch.is_on());
        assert_eq!(switch.icon(), ExportLimitSwitch::ICON_ON);
        assert_eq!(
            inverter.calls(),
            vec![ClientCall::SetExportLimit(DeviceUnits::new(300))]
        );
        let event = rx.try_recv().unwrap();
        assert_eq!(event.new_state(), Some(EntityState::Switch { is_on: true }));
    }

    #[tokio::test]
    async fn turn_off_unsets_instead_of_writing_zero() {
        let (inverter, _, switch) = setup(300);
        switch.turn_on().await.unwrap();
        inverter.clear_calls();

        switch.turn_off().await.unwrap();

        assert!(!switch.is_on());
        assert_eq!(inverter.calls(), vec![ClientCall::UnsetExportLimit]);
    }

    #[tokio::test]
    async fn failed_turn_on_keeps_switch_off() {
        let (inverter, bus, switch) = setup(300);
        let mut rx = bus.subscribe();
        inverter.set_failing(true);

        let err = switch.turn_on().await.unwrap_err();

        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::ConnectionFailed(_))
        ));
        assert!(!switch.is_on());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn turn_on_with_zero_limit_is_rejected_without_calling_inverter() {
        let (inverter, _, switch) = setup(0);

        let err = switch.turn_on().await.unwrap_err();

        assert!(matches!(err, Error::Value(ValueError::OutOfRange { .. })));
        assert!(inverter.calls().is_empty());
    }

    #[tokio::test]
    async fn repeated_turn_on_publishes_once() {
        let (_, bus, switch) = setup(300);
        let mut rx = bus.subscribe();

        switch.turn_on().await.unwrap();
        switch.turn_on().await.unwrap();

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn refresh_with_reading_turns_on_and_caches_limit() {
        let (inverter, _, switch) = setup(300);
        inverter.set_limit(DeviceUnits::new(500));

        switch.refresh().await.unwrap();

        assert!(switch.is_on());
        assert_eq!(switch.cached_limit(), DeviceUnits::new(500));
    }

    #[tokio::test]
    async fn refresh_with_zero_turns_off_and_keeps_cached_limit() {
        let (inverter, _, switch) = setup(300);
        switch.turn_on().await.unwrap();
        inverter.set_limit(DeviceUnits::ZERO);

        switch.refresh().await.unwrap();

        assert!(!switch.is_on());
        assert_eq!(switch.cached_limit(), DeviceUnits::new(300));
    }

    #[tokio::test]
    async fn peer_change_while_on_reapplies_limit() {
        let (inverter, _, switch) = setup(100);
        switch.turn_on().await.unwrap();
        inverter.clear_calls();

        switch
            .handle_event(&number_event(HOST, 2500.0, false))
            .await
            .unwrap();

        assert_eq!(switch.cached_limit(), DeviceUnits::new(250));
        assert_eq!(
            inverter.calls(),
            vec![ClientCall::SetExportLimit(DeviceUnits::new(250))]
        );
    }

    #[tokio::test]
    async fn peer_change_already_on_device_is_not_written_again() {
        let (inverter, _, switch) = setup(100);
        switch.turn_on().await.unwrap();
        inverter.clear_calls();

        switch
            .handle_event(&number_event(HOST, 2500.0, true))
            .await
            .unwrap();

        assert_eq!(switch.cached_limit(), DeviceUnits::new(250));
        assert!(inverter.calls().is_empty());
    }

    #[tokio::test]
    async fn peer_change_while_off_only_updates_cache() {
        let (inverter, _, switch) = setup(100);

        switch
            .handle_event(&number_event(HOST, 4000.0, false))
            .await
            .unwrap();

        assert!(!switch.is_on());
        assert_eq!(switch.cached_limit(), DeviceUnits::new(400));
        assert!(inverter.calls().is_empty());
    }

    #[tokio::test]
    async fn events_from_other_entities_are_ignored() {
        let (inverter, _, switch) = setup(100);
        switch.turn_on().await.unwrap();
        inverter.clear_calls();

        // Same suffix, different inverter
        switch
            .handle_event(&number_event("10.0.0.2", 2500.0, false))
            .await
            .unwrap();
        // Own events
        switch
            .handle_event(&Event::state_changed(
                EntityId::switch(HOST),
                EntityState::Switch { is_on: false },
            ))
            .await
            .unwrap();

        assert!(switch.is_on());
        assert_eq!(switch.cached_limit(), DeviceUnits::new(100));
        assert!(inverter.calls().is_empty());
    }
}
