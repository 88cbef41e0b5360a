// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interactive setup of a new inverter.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use super::{ConfigEntry, EntryData, UserInput};
use crate::client::{Connector, DeviceSession};
use crate::error::{ProtocolError, SetupError};

/// Form key for errors not tied to a single field.
pub const BASE_ERROR_KEY: &str = "base";

/// Abort reason when the inverter serial already has an entry.
pub const ALREADY_CONFIGURED: &str = "already_configured";

/// Outcome of a setup step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowResult {
    /// Validation succeeded; the entry should be persisted.
    CreateEntry {
        /// Entry title.
        title: String,
        /// The new entry.
        entry: ConfigEntry,
    },
    /// Show the form again, with errors keyed by field (or `base`).
    ShowForm {
        /// Error keys by field name. Empty on the first step.
        errors: BTreeMap<String, String>,
    },
    /// The flow ends without creating an entry.
    Abort {
        /// Why the flow ended.
        reason: String,
    },
}

impl FlowResult {
    fn form() -> Self {
        Self::ShowForm {
            errors: BTreeMap::new(),
        }
    }

    fn form_error(field: &str, key: &str) -> Self {
        Self::ShowForm {
            errors: BTreeMap::from([(field.to_string(), key.to_string())]),
        }
    }

    /// Returns the created entry, if any.
    #[must_use]
    pub fn entry(&self) -> Option<&ConfigEntry> {
        match self {
            Self::CreateEntry { entry, .. } => Some(entry),
            _ => None,
        }
    }

    /// Returns the form errors, if the form is shown again.
    #[must_use]
    pub fn errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::ShowForm { errors } => Some(errors),
            _ => None,
        }
    }
}

/// Validates user input against a live inverter.
///
/// The flow checks the form schema first, without contacting the inverter.
/// It then connects, reads the serial number used as the entry's unique id,
/// and refuses serials that already have an entry.
pub struct ConfigFlow {
    connector: Arc<dyn Connector>,
    call_timeout: Duration,
}

impl ConfigFlow {
    /// Creates a flow that builds clients with `connector`.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, call_timeout: Duration) -> Self {
        Self {
            connector,
            call_timeout,
        }
    }

    /// Runs the user step.
    ///
    /// `None` shows the empty form. `configured` holds the unique ids of the
    /// existing entries.
    pub async fn step_user(
        &self,
        input: Option<UserInput>,
        configured: &HashSet<String>,
    ) -> FlowResult {
        let Some(input) = input else {
            return FlowResult::form();
        };

        let data = match input.validate() {
            Ok(data) => data,
            Err((field, err)) => {
                tracing::debug!(field, error = %err, "Setup input rejected");
                return FlowResult::form_error(field, err.error_key());
            }
        };

        let serial = match self.probe(&data).await {
            Ok(serial) => serial,
            Err(err) => {
                if let SetupError::Unknown(ref detail) = err {
                    tracing::error!(host = %data.host, %detail, "Unexpected error during setup");
                } else {
                    tracing::debug!(host = %data.host, error = %err, "Setup validation failed");
                }
                return FlowResult::form_error(BASE_ERROR_KEY, err.error_key());
            }
        };

        if configured.contains(&serial) {
            tracing::debug!(%serial, "Inverter already configured");
            return FlowResult::Abort {
                reason: ALREADY_CONFIGURED.to_string(),
            };
        }

        let entry = ConfigEntry::new(serial, data);
        tracing::info!(host = %entry.host(), serial = %entry.unique_id, "Inverter validated");
        FlowResult::CreateEntry {
            title: entry.title.clone(),
            entry,
        }
    }

    /// Connects to the inverter and reads its serial number.
    async fn probe(&self, data: &EntryData) -> Result<String, SetupError> {
        let client = self.connector.create(&data.host, data.mode);
        let session = DeviceSession::new(data.host.clone(), client).with_timeout(self.call_timeout);

        match session.connect().await {
            Ok(true) => {}
            Ok(false) => return Err(SetupError::CannotConnect),
            Err(err) => return Err(setup_error(err)),
        }

        session.device_serial_number().await.map_err(setup_error)
    }
}

impl std::fmt::Debug for ConfigFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigFlow")
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

fn setup_error(err: ProtocolError) -> SetupError {
    match err {
        ProtocolError::AuthenticationFailed => SetupError::InvalidAuth,
        other => SetupError::Unknown(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{BoxedClient, ClientCall, SimulatedInverter};
    use crate::types::{CommunicationMode, DeviceUnits};

    fn flow(inverter: &SimulatedInverter) -> ConfigFlow {
        let inverter = inverter.clone();
        let connector = move |_host: &str, _mode: CommunicationMode| -> BoxedClient {
            Box::new(inverter.clone())
        };
        ConfigFlow::new(Arc::new(connector), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn no_input_shows_empty_form() {
        let inverter = SimulatedInverter::new("SN1");
        let result = flow(&inverter).step_user(None, &HashSet::new()).await;
        assert_eq!(result.errors(), Some(&BTreeMap::new()));
        assert!(inverter.calls().is_empty());
    }

    #[tokio::test]
    async fn valid_input_creates_entry() {
        let inverter = SimulatedInverter::new("SN1");
        let input = UserInput::new("10.0.0.1", 3000).with_mode("modbus");

        let result = flow(&inverter).step_user(Some(input), &HashSet::new()).await;

        let FlowResult::CreateEntry { title, entry } = result else {
            panic!("expected an entry, got {result:?}");
        };
        assert_eq!(title, "Sungrow Export Limit");
        assert_eq!(entry.unique_id, "SN1");
        assert_eq!(entry.data.export_limit, DeviceUnits::new(300));
        assert_eq!(entry.data.mode, CommunicationMode::Modbus);
        assert_eq!(
            inverter.calls(),
            vec![ClientCall::Connect, ClientCall::DeviceSerialNumber]
        );
    }

    #[tokio::test]
    async fn schema_errors_never_reach_the_inverter() {
        let inverter = SimulatedInverter::new("SN1");
        let flow = flow(&inverter);

        let result = flow
            .step_user(Some(UserInput::new("10.0.0.1", 600_000)), &HashSet::new())
            .await;
        assert_eq!(
            result.errors().and_then(|e| e.get("export_limit")).map(String::as_str),
            Some("out_of_range")
        );

        let result = flow
            .step_user(
                Some(UserInput::new("10.0.0.1", 100).with_mode("serial")),
                &HashSet::new(),
            )
            .await;
        assert_eq!(
            result.errors().and_then(|e| e.get("mode")).map(String::as_str),
            Some("invalid_mode")
        );

        assert!(inverter.calls().is_empty());
    }

    #[tokio::test]
    async fn unreachable_inverter_reports_cannot_connect() {
        let inverter = SimulatedInverter::new("SN1");
        inverter.set_reachable(false);

        let result = flow(&inverter)
            .step_user(Some(UserInput::new("10.0.0.1", 100)), &HashSet::new())
            .await;

        assert_eq!(
            result.errors().and_then(|e| e.get("base")).map(String::as_str),
            Some("cannot_connect")
        );
        assert_eq!(inverter.calls(), vec![ClientCall::Connect]);
    }

    #[tokio::test]
    async fn rejected_credentials_report_invalid_auth() {
        let inverter = SimulatedInverter::new("SN1");
        inverter.set_reject_auth(true);

        let result = flow(&inverter)
            .step_user(Some(UserInput::new("10.0.0.1", 100)), &HashSet::new())
            .await;

        assert_eq!(
            result.errors().and_then(|e| e.get("base")).map(String::as_str),
            Some("invalid_auth")
        );
    }

    #[tokio::test]
    async fn client_failure_reports_unknown() {
        let inverter = SimulatedInverter::new("SN1");
        inverter.set_failing(true);

        let result = flow(&inverter)
            .step_user(Some(UserInput::new("10.0.0.1", 100)), &HashSet::new())
            .await;

        assert_eq!(
            result.errors().and_then(|e| e.get("base")).map(String::as_str),
            Some("unknown")
        );
    }

    #[tokio::test]
    async fn known_serial_aborts() {
        let inverter = SimulatedInverter::new("SN1");
        let configured = HashSet::from(["SN1".to_string()]);

        let result = flow(&inverter)
            .step_user(Some(UserInput::new("10.0.0.1", 100)), &configured)
            .await;

        assert_eq!(
            result,
            FlowResult::Abort {
                reason: "already_configured".to_string()
            }
        );
        assert!(result.entry().is_none());
    }
}
