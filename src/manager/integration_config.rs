// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Runtime settings shared by every managed inverter.

use std::time::Duration;

use crate::client::DeviceSession;

/// Default interval between two state refreshes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default event bus capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Settings for the [`ExportLimitManager`](super::ExportLimitManager).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use sungrow_export_limit::manager::IntegrationConfig;
///
/// // Default settings: 10 s call timeout, refresh every 30 s
/// let config = IntegrationConfig::default();
///
/// // Custom settings
/// let config = IntegrationConfig::new()
///     .with_call_timeout(Duration::from_secs(5))
///     .with_poll_interval(Duration::from_secs(60))
///     .with_event_capacity(64);
///
/// // Refresh only on demand
/// let config = IntegrationConfig::new().without_polling();
/// assert!(config.poll_interval.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationConfig {
    /// Maximum duration of one inverter client call.
    pub call_timeout: Duration,
    /// Interval between periodic refreshes (`None` disables polling).
    pub poll_interval: Option<Duration>,
    /// Capacity of the event bus.
    pub event_capacity: usize,
}

impl IntegrationConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the call timeout.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Sets the polling interval.
    ///
    /// A zero interval disables polling.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Disables periodic refreshes.
    #[must_use]
    pub fn without_polling(mut self) -> Self {
        self.poll_interval = None;
        self
    }

    /// Sets the event bus capacity.
    ///
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            call_timeout: DeviceSession::DEFAULT_TIMEOUT,
            poll_interval: Some(DEFAULT_POLL_INTERVAL),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
