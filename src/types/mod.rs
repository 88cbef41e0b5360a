// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for inverter export limits.
//!
//! # Types
//!
//! - [`DeviceUnits`] - Export limit in the inverter's native unit (10 W)
//! - [`CommunicationMode`] - Transport used to reach the inverter

mod mode;
mod units;

pub use mode::CommunicationMode;
pub use units::{DeviceUnits, WATTS_PER_UNIT, to_device_units, to_watts};
