// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for switch/number synchronization through the manager.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sungrow_export_limit::client::{BoxedClient, ClientCall, SimulatedInverter};
use sungrow_export_limit::event::{EntityId, EntityState, Event};
use sungrow_export_limit::manager::{ExportLimitManager, IntegrationConfig};
use sungrow_export_limit::setup::{ConfigEntry, EntryData};
use sungrow_export_limit::types::{CommunicationMode, DeviceUnits};
use sungrow_export_limit::{EntryId, Error, ProtocolError};

// ============================================================================
// Helpers
// ============================================================================

/// Inverters reachable by host, shared with the manager's connector.
#[derive(Clone, Default)]
struct Network {
    inverters: Arc<Mutex<HashMap<String, SimulatedInverter>>>,
}

impl Network {
    fn add(&self, host: &str, serial: &str) -> SimulatedInverter {
        let inverter = SimulatedInverter::new(serial);
        self.inverters
            .lock()
            .insert(host.to_string(), inverter.clone());
        inverter
    }

    fn manager(&self, config: IntegrationConfig) -> ExportLimitManager {
        let network = self.clone();
        ExportLimitManager::with_config(
            move |host: &str, _mode: CommunicationMode| -> BoxedClient {
                let inverter = network
                    .inverters
                    .lock()
                    .get(host)
                    .cloned()
                    .unwrap_or_else(|| SimulatedInverter::new("unknown"));
                Box::new(inverter)
            },
            config,
        )
    }
}

fn entry(serial: &str, host: &str, export_limit: u32) -> ConfigEntry {
    ConfigEntry::new(
        serial,
        EntryData {
            host: host.to_string(),
            export_limit: DeviceUnits::new(export_limit),
            mode: CommunicationMode::Http,
        },
    )
}

/// Sets up one inverter at `10.0.0.1` with an initial limit of `units`.
async fn single(units: u32) -> (ExportLimitManager, SimulatedInverter, EntryId) {
    let network = Network::default();
    let inverter = network.add("10.0.0.1", "SN1");
    let manager = network.manager(IntegrationConfig::new().without_polling());
    let entry_id = manager
        .add_entry(entry("SN1", "10.0.0.1", units))
        .await
        .unwrap();
    inverter.clear_calls();
    (manager, inverter, entry_id)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Gives the listeners time to process anything still in flight.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

fn set(units: u32) -> ClientCall {
    ClientCall::SetExportLimit(DeviceUnits::new(units))
}

// ============================================================================
// Switch Commands
// ============================================================================

mod switch_commands {
    use super::*;

    #[tokio::test]
    async fn turn_on_writes_cached_setpoint_once() {
        let (manager, inverter, entry_id) = single(300).await;

        manager.turn_on(entry_id).await.unwrap();
        settle().await;

        assert_eq!(inverter.write_calls(), vec![set(300)]);
        assert_eq!(inverter.limit(), DeviceUnits::new(300));
    }

    #[tokio::test]
    async fn turn_off_unsets_once_and_never_writes_zero() {
        let (manager, inverter, entry_id) = single(300).await;
        manager.turn_on(entry_id).await.unwrap();
        settle().await;
        inverter.clear_calls();

        manager.turn_off(entry_id).await.unwrap();
        settle().await;

        assert_eq!(inverter.calls(), vec![ClientCall::UnsetExportLimit]);
        assert!(!manager.switch(entry_id).await.unwrap().is_on());
    }

    #[tokio::test]
    async fn turn_on_is_reflected_by_number() {
        let (manager, _inverter, entry_id) = single(300).await;
        let number = manager.number(entry_id).await.unwrap();

        manager.turn_on(entry_id).await.unwrap();

        wait_until(|| number.is_switch_on()).await;
    }

    #[tokio::test]
    async fn failed_turn_on_keeps_switch_off() {
        let (manager, inverter, entry_id) = single(300).await;
        inverter.set_failing(true);

        let result = manager.turn_on(entry_id).await;

        assert!(matches!(result, Err(Error::Protocol(_))));
        assert!(!manager.switch(entry_id).await.unwrap().is_on());
    }

    #[tokio::test]
    async fn slow_inverter_times_out() {
        let network = Network::default();
        let inverter = network.add("10.0.0.1", "SN1");
        let manager = network.manager(
            IntegrationConfig::new()
                .without_polling()
                .with_call_timeout(Duration::from_millis(50)),
        );
        let entry_id = manager
            .add_entry(entry("SN1", "10.0.0.1", 300))
            .await
            .unwrap();
        inverter.set_delay(Duration::from_millis(300));

        let result = manager.turn_on(entry_id).await;

        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::Timeout(50)))
        ));
        assert!(!manager.switch(entry_id).await.unwrap().is_on());
    }
}

// ============================================================================
// Setpoint Changes
// ============================================================================

mod setpoint_changes {
    use super::*;

    #[tokio::test]
    async fn setpoint_change_while_on_writes_once() {
        let (manager, inverter, entry_id) = single(100).await;
        manager.turn_on(entry_id).await.unwrap();

        manager.set_value(entry_id, 2500.0).await.unwrap();
        wait_until(|| inverter.write_calls().len() >= 2).await;
        settle().await;

        assert_eq!(inverter.write_calls(), vec![set(100), set(250)]);
        assert_eq!(inverter.limit(), DeviceUnits::new(250));
    }

    #[tokio::test]
    async fn turn_off_after_setpoint_change_keeps_value() {
        let (manager, inverter, entry_id) = single(100).await;
        manager.turn_on(entry_id).await.unwrap();
        manager.set_value(entry_id, 2500.0).await.unwrap();
        wait_until(|| inverter.write_calls().len() >= 2).await;
        settle().await;
        inverter.clear_calls();

        manager.turn_off(entry_id).await.unwrap();
        settle().await;

        assert_eq!(inverter.calls(), vec![ClientCall::UnsetExportLimit]);
        let number = manager.number(entry_id).await.unwrap();
        assert!((number.native_value() - 2500.0).abs() < f64::EPSILON);
        assert!(!number.is_switch_on());
    }

    #[tokio::test]
    async fn setpoint_staged_while_off_is_used_on_turn_on() {
        let (manager, inverter, entry_id) = single(100).await;
        let switch = manager.switch(entry_id).await.unwrap();

        manager.set_value(entry_id, 4200.0).await.unwrap();
        wait_until(|| switch.cached_limit() == DeviceUnits::new(420)).await;
        assert!(inverter.write_calls().is_empty());

        manager.turn_on(entry_id).await.unwrap();
        settle().await;

        assert_eq!(inverter.write_calls(), vec![set(420)]);
    }

    #[tokio::test]
    async fn resetting_displayed_setpoint_overrides_stale_switch_cache() {
        let (manager, inverter, entry_id) = single(100).await;
        let switch = manager.switch(entry_id).await.unwrap();
        let number = manager.number(entry_id).await.unwrap();

        // Only the switch sees the inverter's new limit
        inverter.set_limit(DeviceUnits::new(70));
        switch.refresh().await.unwrap();
        assert_eq!(switch.cached_limit(), DeviceUnits::new(70));
        assert!((number.native_value() - 1000.0).abs() < f64::EPSILON);

        manager.set_value(entry_id, 1000.0).await.unwrap();
        wait_until(|| switch.cached_limit() == DeviceUnits::new(100)).await;
        settle().await;

        manager.turn_off(entry_id).await.unwrap();
        settle().await;
        inverter.clear_calls();
        manager.turn_on(entry_id).await.unwrap();
        settle().await;

        assert_eq!(inverter.write_calls(), vec![set(100)]);
    }

    #[tokio::test]
    async fn off_grid_setpoint_snaps_down() {
        let (manager, _inverter, entry_id) = single(100).await;

        manager.set_value(entry_id, 1234.0).await.unwrap();

        let number = manager.number(entry_id).await.unwrap();
        assert!((number.native_value() - 1230.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn out_of_range_setpoint_is_rejected_without_calls() {
        let (manager, inverter, entry_id) = single(100).await;

        assert!(matches!(
            manager.set_value(entry_id, 60_000.0).await,
            Err(Error::Value(_))
        ));
        assert!(matches!(
            manager.set_value(entry_id, 5.0).await,
            Err(Error::Value(_))
        ));
        assert!(inverter.calls().is_empty());
    }
}

// ============================================================================
// Refresh
// ============================================================================

mod refresh {
    use super::*;

    #[tokio::test]
    async fn zero_reading_turns_switch_off_and_keeps_value() {
        let (manager, inverter, entry_id) = single(100).await;
        manager.turn_on(entry_id).await.unwrap();
        manager.set_value(entry_id, 2000.0).await.unwrap();
        settle().await;

        inverter.set_limit(DeviceUnits::ZERO);
        manager.refresh(entry_id).await.unwrap();

        assert!(!manager.switch(entry_id).await.unwrap().is_on());
        let number = manager.number(entry_id).await.unwrap();
        assert!((number.native_value() - 2000.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn nonzero_reading_turns_switch_on_and_sets_value() {
        let (manager, inverter, entry_id) = single(100).await;

        inverter.set_limit(DeviceUnits::new(500));
        manager.refresh(entry_id).await.unwrap();
        settle().await;

        let switch = manager.switch(entry_id).await.unwrap();
        let number = manager.number(entry_id).await.unwrap();
        assert!(switch.is_on());
        assert_eq!(switch.cached_limit(), DeviceUnits::new(500));
        assert!((number.native_value() - 5000.0).abs() < f64::EPSILON);
        assert!(inverter.write_calls().is_empty());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_last_known_state() {
        let (manager, inverter, entry_id) = single(100).await;
        manager.turn_on(entry_id).await.unwrap();
        inverter.set_failing(true);

        assert!(manager.refresh(entry_id).await.is_err());
        assert!(manager.switch(entry_id).await.unwrap().is_on());
    }

    #[tokio::test]
    async fn poller_picks_up_external_changes() {
        let network = Network::default();
        let inverter = network.add("10.0.0.1", "SN1");
        let manager =
            network.manager(IntegrationConfig::new().with_poll_interval(Duration::from_millis(20)));
        let entry_id = manager
            .add_entry(entry("SN1", "10.0.0.1", 100))
            .await
            .unwrap();
        let switch = manager.switch(entry_id).await.unwrap();
        let number = manager.number(entry_id).await.unwrap();

        inverter.set_limit(DeviceUnits::new(70));

        wait_until(|| switch.is_on() && number.is_switch_on()).await;
        assert!((number.native_value() - 700.0).abs() < f64::EPSILON);
    }
}

// ============================================================================
// Isolation
// ============================================================================

mod isolation {
    use super::*;

    #[tokio::test]
    async fn unrelated_events_change_nothing() {
        let (manager, inverter, entry_id) = single(100).await;
        manager.turn_on(entry_id).await.unwrap();
        settle().await;
        inverter.clear_calls();
        let switch = manager.switch(entry_id).await.unwrap();
        let number = manager.number(entry_id).await.unwrap();

        switch
            .handle_event(&Event::state_changed(
                EntityId::number("10.0.0.99"),
                EntityState::Number {
                    value_watts: 4000.0,
                    on_device: false,
                },
            ))
            .await
            .unwrap();
        number
            .handle_event(&Event::state_changed(
                EntityId::switch("10.0.0.99"),
                EntityState::Switch { is_on: false },
            ))
            .await
            .unwrap();

        assert!(inverter.calls().is_empty());
        assert_eq!(switch.cached_limit(), DeviceUnits::new(100));
        assert!(number.is_switch_on());
        assert!((number.native_value() - 1000.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn inverters_stay_independent() {
        let network = Network::default();
        let first = network.add("10.0.0.1", "SN1");
        let second = network.add("10.0.0.2", "SN2");
        let manager = network.manager(IntegrationConfig::new().without_polling());
        let first_id = manager
            .add_entry(entry("SN1", "10.0.0.1", 100))
            .await
            .unwrap();
        let second_id = manager
            .add_entry(entry("SN2", "10.0.0.2", 200))
            .await
            .unwrap();

        manager.turn_on(first_id).await.unwrap();
        manager.turn_on(second_id).await.unwrap();
        manager.set_value(first_id, 3300.0).await.unwrap();
        wait_until(|| first.write_calls().len() >= 2).await;
        settle().await;

        assert_eq!(first.write_calls(), vec![set(100), set(330)]);
        assert_eq!(second.write_calls(), vec![set(200)]);
        let second_switch = manager.switch(second_id).await.unwrap();
        assert_eq!(second_switch.cached_limit(), DeviceUnits::new(200));
    }

    #[tokio::test]
    async fn removed_entry_stops_forwarding() {
        let (manager, _inverter, entry_id) = single(100).await;
        let switch = manager.switch(entry_id).await.unwrap();
        let mut events = manager.subscribe();

        assert!(manager.remove_entry(entry_id).await);
        assert_eq!(events.recv().await.unwrap(), Event::entry_removed(entry_id));
        settle().await;

        // The entity outlives its entry here, but nothing reaches the manager
        switch.turn_on().await.unwrap();
        let next = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
        assert!(next.is_err());
        assert!(manager.switch(entry_id).await.is_none());
    }

    #[tokio::test]
    async fn state_changes_reach_manager_subscribers() {
        let (manager, _inverter, entry_id) = single(100).await;
        let mut events = manager.subscribe();

        manager.turn_on(entry_id).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(event.is_from(&EntityId::switch("10.0.0.1")));
        assert_eq!(event.new_state(), Some(EntityState::Switch { is_on: true }));
    }
}
