// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The two entities exposed for each inverter.
//!
//! - [`ExportLimitSwitch`]: whether an export limit is enforced
//! - [`ExportLimitNumber`]: the limit to enforce, in watts
//!
//! The entities do not reference each other. Each keeps a cached copy of its
//! sibling's last known value, updated from the sibling's state change events
//! on the [`EventBus`](crate::event::EventBus). The copies converge; the
//! inverter itself, read through `refresh()`, remains the source of truth.

mod listener;
mod number;
mod switch;

pub use number::ExportLimitNumber;
pub use switch::ExportLimitSwitch;
