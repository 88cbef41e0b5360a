// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion between watts and the inverter's native unit.
//!
//! The inverter expresses its export limit in dekawatts (1 unit = 10 W).
//! Every value crossing into or out of the inverter client goes through
//! [`DeviceUnits`], so the watts shown to users and the integer sent on the
//! wire never drift apart. The conversion is lossy below 10 W.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Number of watts in one device unit.
pub const WATTS_PER_UNIT: f64 = 10.0;

/// An export limit expressed in device units (dekawatts).
///
/// A value of zero means "no limit enforced" when read back from the
/// inverter.
///
/// # Examples
///
/// ```
/// use sungrow_export_limit::types::DeviceUnits;
///
/// let limit = DeviceUnits::from_watts(3000.0);
/// assert_eq!(limit.value(), 300);
/// assert!((limit.to_watts() - 3000.0).abs() < f64::EPSILON);
///
/// // Sub-10 W precision is dropped
/// assert_eq!(DeviceUnits::from_watts(2999.0).value(), 299);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DeviceUnits(u32);

impl DeviceUnits {
    /// The "disabled" reading.
    pub const ZERO: Self = Self(0);

    /// Smallest limit the inverter accepts (10 W).
    pub const MIN_LIMIT: Self = Self(1);

    /// Largest limit the inverter accepts (50 000 W).
    pub const MAX_LIMIT: Self = Self(5000);

    /// Creates a value from a raw device reading.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Converts watts to device units, truncating towards zero.
    ///
    /// Negative and non-finite inputs saturate to the representable range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_watts(watts: f64) -> Self {
        // `as` saturates: NaN and negatives become 0
        Self((watts / WATTS_PER_UNIT).floor() as u32)
    }

    /// Returns the raw device value.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Converts back to watts.
    #[must_use]
    pub fn to_watts(&self) -> f64 {
        f64::from(self.0) * WATTS_PER_UNIT
    }

    /// Returns `true` if the reading means no limit is enforced.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.0 == 0
    }

    /// Checks that the value can be written to the inverter as a limit.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` (in device units) if the value is
    /// outside `[MIN_LIMIT, MAX_LIMIT]`.
    pub fn validate_limit(self) -> Result<Self, ValueError> {
        if self < Self::MIN_LIMIT || self > Self::MAX_LIMIT {
            return Err(ValueError::OutOfRange {
                min: f64::from(Self::MIN_LIMIT.0),
                max: f64::from(Self::MAX_LIMIT.0),
                actual: f64::from(self.0),
            });
        }
        Ok(self)
    }
}

impl fmt::Display for DeviceUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} daW", self.0)
    }
}

impl From<u32> for DeviceUnits {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Converts watts to device units. See [`DeviceUnits::from_watts`].
#[must_use]
pub fn to_device_units(watts: f64) -> DeviceUnits {
    DeviceUnits::from_watts(watts)
}

/// Converts device units to watts. See [`DeviceUnits::to_watts`].
#[must_use]
pub fn to_watts(units: DeviceUnits) -> f64 {
    units.to_watts()
}
