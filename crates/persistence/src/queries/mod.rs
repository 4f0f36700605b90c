// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Read-only queries.
//!
//! Every function takes the connection explicitly so it can run inside a
//! caller's transaction as well as on its own.
//!
//! - `slots`: availability slots and sub-slot linkage
//! - `templates`: availability templates
//! - `leaves`: doctor leave records
//! - `assignments`: assignments and payment settlements
//! - `usage`: monthly usage records
//! - `subscriptions`: plan subscriptions
//! - `audit`: audit trail

pub mod assignments;
pub mod audit;
pub mod leaves;
pub mod slots;
pub mod subscriptions;
pub mod templates;
pub mod usage;
