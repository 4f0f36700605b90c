// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! State-changing operations.
//!
//! Functions here never open a transaction themselves. Composite operations
//! (create-assignment, reserve-sub-slot, transitions, sweep, quota checks)
//! assume the caller holds an immediate transaction so the checks they make
//! and the writes that follow see the same state.
//!
//! ## Module Organization
//!
//! - `audit`: Audit event persistence
//! - `slots`: Slot creation, reservation, direct booking, release
//! - `templates`: Template creation and deactivation
//! - `leaves`: Leave records
//! - `assignments`: Assignment creation and compare-and-swap transitions
//! - `usage`: Quota check-and-reserve and the monthly reset
//! - `subscriptions`: Plan subscription upserts
//! - `sweep`: The expiry sweep

pub mod assignments;
pub mod audit;
pub mod leaves;
pub mod slots;
pub mod subscriptions;
pub mod sweep;
pub mod templates;
pub mod usage;
