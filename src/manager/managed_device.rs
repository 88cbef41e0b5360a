// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One configured inverter and its running tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::client::{BoxedClient, DeviceSession};
use crate::entity::{ExportLimitNumber, ExportLimitSwitch};
use crate::error::Result;
use crate::event::{EntryId, Event, EventBus};
use crate::setup::ConfigEntry;

use super::IntegrationConfig;

/// An inverter owned by the manager.
///
/// Both entities share one [`DeviceSession`] and synchronize over a bus
/// private to this device, so entities of different inverters never see
/// each other's events. Everything published there is forwarded to the
/// manager's bus. The listeners, the forwarder and the optional poll task
/// are aborted when the device is dropped.
pub(crate) struct ManagedDevice {
    entry: ConfigEntry,
    bus: EventBus,
    switch: Arc<ExportLimitSwitch>,
    number: Arc<ExportLimitNumber>,
    tasks: Vec<JoinHandle<()>>,
}

impl ManagedDevice {
    /// Builds the entities and starts their tasks.
    ///
    /// Both entities and the forwarder subscribe before anything is
    /// published, so none of them misses the first state change.
    pub(crate) fn start(
        entry: ConfigEntry,
        client: BoxedClient,
        events: &EventBus,
        config: &IntegrationConfig,
    ) -> Self {
        let bus = EventBus::with_capacity(config.event_capacity);
        let session =
            DeviceSession::new(entry.data.host.clone(), client).with_timeout(config.call_timeout);
        let initial_limit = entry.data.export_limit;

        let switch = Arc::new(ExportLimitSwitch::new(
            session.clone(),
            bus.clone(),
            initial_limit,
        ));
        let number = Arc::new(ExportLimitNumber::new(
            session.clone(),
            bus.clone(),
            initial_limit,
        ));

        let switch_rx = bus.subscribe();
        let number_rx = bus.subscribe();
        let forward_rx = bus.subscribe();
        let mut tasks = vec![
            switch.spawn_listener(switch_rx),
            number.spawn_listener(number_rx),
            spawn_forwarder(forward_rx, events.clone()),
        ];

        if let Some(interval) = config.poll_interval {
            tasks.push(spawn_poller(
                session.clone(),
                Arc::clone(&switch),
                Arc::clone(&number),
                interval,
            ));
        }

        tracing::debug!(
            entry_id = %entry.entry_id,
            host = %entry.host(),
            mode = %entry.data.mode,
            %initial_limit,
            "Inverter started"
        );

        Self {
            entry,
            bus,
            switch,
            number,
            tasks,
        }
    }

    pub(crate) fn id(&self) -> EntryId {
        self.entry.entry_id
    }

    pub(crate) fn entry(&self) -> &ConfigEntry {
        &self.entry
    }

    pub(crate) fn switch(&self) -> Arc<ExportLimitSwitch> {
        Arc::clone(&self.switch)
    }

    pub(crate) fn number(&self) -> Arc<ExportLimitNumber> {
        Arc::clone(&self.number)
    }
}

impl Drop for ManagedDevice {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl std::fmt::Debug for ManagedDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedDevice")
            .field("entry_id", &self.entry.entry_id)
            .field("host", &self.entry.data.host)
            .field("subscribers", &self.bus.subscriber_count())
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

/// Refreshes both entities from the inverter.
///
/// The number is refreshed even if the switch refresh fails.
///
/// # Errors
///
/// Returns the first failure.
pub(crate) async fn refresh_entities(
    switch: &ExportLimitSwitch,
    number: &ExportLimitNumber,
) -> Result<()> {
    let switch_result = switch.refresh().await;
    let number_result = number.refresh().await;
    switch_result.and(number_result)
}

/// Republishes every event of a device bus on the manager's bus.
fn spawn_forwarder(mut rx: broadcast::Receiver<Event>, events: EventBus) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => events.publish(event),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Event forwarder lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn spawn_poller(
    session: DeviceSession,
    switch: Arc<ExportLimitSwitch>,
    number: Arc<ExportLimitNumber>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the initial refresh runs on setup.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if session.is_busy() {
                tracing::debug!(host = %session.host(), "Client call in flight, skipping refresh");
                continue;
            }
            if let Err(e) = refresh_entities(&switch, &number).await {
                tracing::warn!(
                    host = %switch.entity_id().host(),
                    error = %e,
                    "Periodic refresh failed, keeping last known state"
                );
            }
        }
    })
}
