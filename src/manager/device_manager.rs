// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Manager for coordinating multiple inverters.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};

use crate::client::Connector;
use crate::entity::{ExportLimitNumber, ExportLimitSwitch};
use crate::error::{Error, Result};
use crate::event::{EntryId, Event, EventBus};
use crate::setup::{ALREADY_CONFIGURED, ConfigEntry, ConfigFlow, FlowResult, UserInput};

use super::IntegrationConfig;
use super::managed_device::{ManagedDevice, refresh_entities};

/// Manager for coordinating multiple inverters.
///
/// The `ExportLimitManager` owns one [`ConfigEntry`] per inverter and the
/// two entities built for each entry. Entities synchronize over a bus
/// private to their inverter; every event is also republished on the
/// manager's [`EventBus`], together with entry lifecycle events.
///
/// # Examples
///
/// ```no_run
/// use sungrow_export_limit::client::{BoxedClient, SimulatedInverter};
/// use sungrow_export_limit::manager::ExportLimitManager;
/// use sungrow_export_limit::setup::{FlowResult, UserInput};
/// use sungrow_export_limit::types::CommunicationMode;
///
/// #[tokio::main]
/// async fn main() -> sungrow_export_limit::Result<()> {
///     let inverter = SimulatedInverter::new("A2231234567");
///     let manager = ExportLimitManager::new(move |_host: &str, _mode: CommunicationMode| -> BoxedClient {
///         Box::new(inverter.clone())
///     });
///
///     let result = manager
///         .configure(Some(UserInput::new("192.168.1.20", 3000)))
///         .await?;
///
///     if let FlowResult::CreateEntry { entry, .. } = result {
///         manager.set_value(entry.entry_id, 2500.0).await?;
///         manager.turn_on(entry.entry_id).await?;
///     }
///     Ok(())
/// }
/// ```
pub struct ExportLimitManager {
    /// Managed inverters, keyed by entry ID.
    devices: Arc<RwLock<HashMap<EntryId, ManagedDevice>>>,
    /// Public event bus: lifecycle events and forwarded entity events.
    event_bus: EventBus,
    /// Builds inverter clients for new entries.
    connector: Arc<dyn Connector>,
    config: IntegrationConfig,
}

impl ExportLimitManager {
    /// Creates a manager with default settings.
    #[must_use]
    pub fn new(connector: impl Connector + 'static) -> Self {
        Self::with_config(connector, IntegrationConfig::default())
    }

    /// Creates a manager with custom settings.
    #[must_use]
    pub fn with_config(connector: impl Connector + 'static, config: IntegrationConfig) -> Self {
        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
            event_bus: EventBus::with_capacity(config.event_capacity),
            connector: Arc::new(connector),
            config,
        }
    }

    /// Returns the active settings.
    #[must_use]
    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    // =========================================================================
    // Subscription
    // =========================================================================

    /// Subscribes to entry and entity events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe()
    }

    /// Returns the number of active event subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.event_bus.subscriber_count()
    }

    // =========================================================================
    // Entry Management
    // =========================================================================

    /// Runs the setup flow and, on success, adds the new entry.
    ///
    /// `None` returns the empty form.
    ///
    /// # Errors
    ///
    /// Validation problems are reported inside the [`FlowResult`]. An error
    /// is returned only if the validated entry cannot be added.
    pub async fn configure(&self, input: Option<UserInput>) -> Result<FlowResult> {
        let configured = self.configured_serials().await;
        let flow = ConfigFlow::new(Arc::clone(&self.connector), self.config.call_timeout);
        let result = flow.step_user(input, &configured).await;

        if let Some(entry) = result.entry() {
            match self.add_entry(entry.clone()).await {
                Ok(_) => {}
                // Another setup for the same serial won the race.
                Err(Error::AlreadyConfigured(_)) => {
                    return Ok(FlowResult::Abort {
                        reason: ALREADY_CONFIGURED.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(result)
    }

    /// Adds an entry, typically one restored from storage.
    ///
    /// The entities are created, their listeners started and their state
    /// read once from the inverter. A failed initial read is logged and the
    /// entities keep their defaults until the next refresh.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyConfigured`] if an entry with the same serial
    /// number exists.
    pub async fn add_entry(&self, entry: ConfigEntry) -> Result<EntryId> {
        if self.configured_serials().await.contains(&entry.unique_id) {
            return Err(Error::AlreadyConfigured(entry.unique_id));
        }

        let client = self.connector.create(&entry.data.host, entry.data.mode);
        let device = ManagedDevice::start(entry, client, &self.event_bus, &self.config);
        let entry_id = device.id();
        let (switch, number) = (device.switch(), device.number());

        {
            let mut devices = self.devices.write().await;
            if devices
                .values()
                .any(|d| d.entry().unique_id == device.entry().unique_id)
            {
                return Err(Error::AlreadyConfigured(device.entry().unique_id.clone()));
            }
            devices.insert(entry_id, device);
        }

        self.event_bus.publish(Event::entry_added(entry_id));

        if let Err(e) = refresh_entities(&switch, &number).await {
            tracing::warn!(%entry_id, error = %e, "Initial refresh failed");
        }

        Ok(entry_id)
    }

    /// Removes an entry and stops its tasks.
    ///
    /// # Returns
    ///
    /// Returns `true` if the entry was found and removed, `false` otherwise.
    pub async fn remove_entry(&self, entry_id: EntryId) -> bool {
        let removed = self.devices.write().await.remove(&entry_id).is_some();

        if removed {
            self.event_bus.publish(Event::entry_removed(entry_id));
        }

        removed
    }

    /// Returns a list of all entry IDs.
    pub async fn entry_ids(&self) -> Vec<EntryId> {
        self.devices.read().await.keys().copied().collect()
    }

    /// Returns the number of configured inverters.
    pub async fn entry_count(&self) -> usize {
        self.devices.read().await.len()
    }

    /// Returns a copy of an entry.
    pub async fn entry(&self, entry_id: EntryId) -> Option<ConfigEntry> {
        self.devices
            .read()
            .await
            .get(&entry_id)
            .map(|d| d.entry().clone())
    }

    /// Returns the switch entity of an entry.
    pub async fn switch(&self, entry_id: EntryId) -> Option<Arc<ExportLimitSwitch>> {
        self.devices.read().await.get(&entry_id).map(ManagedDevice::switch)
    }

    /// Returns the number entity of an entry.
    pub async fn number(&self, entry_id: EntryId) -> Option<Arc<ExportLimitNumber>> {
        self.devices.read().await.get(&entry_id).map(ManagedDevice::number)
    }

    // =========================================================================
    // Entity Control
    // =========================================================================

    /// Enforces the cached export limit on an inverter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryNotFound`] for unknown entries, or the switch error.
    pub async fn turn_on(&self, entry_id: EntryId) -> Result<()> {
        self.require_switch(entry_id).await?.turn_on().await
    }

    /// Removes the export limit from an inverter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryNotFound`] for unknown entries, or the switch error.
    pub async fn turn_off(&self, entry_id: EntryId) -> Result<()> {
        self.require_switch(entry_id).await?.turn_off().await
    }

    /// Sets the export limit setpoint, in watts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryNotFound`] for unknown entries, or the number error.
    pub async fn set_value(&self, entry_id: EntryId, watts: f64) -> Result<()> {
        let number = self
            .number(entry_id)
            .await
            .ok_or(Error::EntryNotFound)?;
        number.set_value(watts).await
    }

    /// Reads both entities back from the inverter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryNotFound`] for unknown entries, or the first
    /// refresh error.
    pub async fn refresh(&self, entry_id: EntryId) -> Result<()> {
        let (switch, number) = {
            let devices = self.devices.read().await;
            let device = devices.get(&entry_id).ok_or(Error::EntryNotFound)?;
            (device.switch(), device.number())
        };
        refresh_entities(&switch, &number).await
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    async fn configured_serials(&self) -> HashSet<String> {
        self.devices
            .read()
            .await
            .values()
            .map(|d| d.entry().unique_id.clone())
            .collect()
    }

    async fn require_switch(&self, entry_id: EntryId) -> Result<Arc<ExportLimitSwitch>> {
        self.switch(entry_id).await.ok_or(Error::EntryNotFound)
    }
}

impl std::fmt::Debug for ExportLimitManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportLimitManager")
            .field("event_bus", &self.event_bus)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
