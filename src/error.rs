// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the export limit library.
//!
//! This module provides the error hierarchy used across the crate: value
//! validation, inverter client communication, persisted entry parsing, and
//! the setup (config flow) failures shown to the user.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred while talking to the inverter client.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing persisted data.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error occurred while setting up a new config entry.
    #[error("setup error: {0}")]
    Setup(#[from] SetupError),

    /// Config entry was not found in the manager.
    #[error("config entry not found")]
    EntryNotFound,

    /// An entry for this device serial number already exists.
    #[error("device {0} is already configured")]
    AlreadyConfigured(String),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
        /// The actual value that was provided.
        actual: f64,
    },

    /// A required field was not provided.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// An unknown communication mode was provided.
    #[error("invalid communication mode: {0}")]
    InvalidMode(String),

    /// A string does not follow the entity identifier convention.
    #[error("invalid entity id: {0}")]
    InvalidEntityId(String),
}

impl ValueError {
    /// Returns the form error key shown next to the offending field.
    #[must_use]
    pub fn error_key(&self) -> &'static str {
        match self {
            Self::OutOfRange { .. } => "out_of_range",
            Self::MissingField(_) => "required",
            Self::InvalidMode(_) => "invalid_mode",
            Self::InvalidEntityId(_) => "invalid_entity_id",
        }
    }
}

/// Errors reported by (or while driving) the inverter client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Connection to the inverter failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The inverter rejected the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The blocking task running the client call failed.
    #[error("client task failed: {0}")]
    TaskFailed(String),
}

/// Errors related to parsing persisted config entries.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while validating a new inverter during setup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// The inverter client could not connect to the host.
    #[error("cannot connect to inverter")]
    CannotConnect,

    /// The inverter client rejected its credentials.
    #[error("invalid authentication")]
    InvalidAuth,

    /// Any other failure during validation.
    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl SetupError {
    /// Returns the form error key reported under `base`.
    #[must_use]
    pub fn error_key(&self) -> &'static str {
        match self {
            Self::CannotConnect => "cannot_connect",
            Self::InvalidAuth => "invalid_auth",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
