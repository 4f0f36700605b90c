// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod template_tests;
mod usage_tests;

use chrono::NaiveDate;
use consult_sched::{EngineConfig, NewAssignment};
use consult_sched_audit::{Actor, Cause};
use consult_sched_domain::{AvailabilitySlot, Priority, TimeRange, parse_date};
use time::OffsetDateTime;
use time::macros::datetime;

use crate::Persistence;

pub const DOCTOR_ID: i64 = 7;
pub const HOSPITAL_ID: i64 = 3;

/// A clock well ahead of the test slot date.
pub fn test_now() -> OffsetDateTime {
    datetime!(2024-11-01 12:00 UTC)
}

pub fn test_config() -> EngineConfig {
    EngineConfig::default()
}

pub fn create_test_actor() -> Actor {
    Actor::new(String::from("hospital:3"), String::from("hospital"))
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("test-cause"), String::from("Test operation"))
}

pub fn date(value: &str) -> NaiveDate {
    parse_date(value).unwrap()
}

pub fn range(start: &str, end: &str) -> TimeRange {
    TimeRange::parse(start, end).unwrap()
}

/// Creates the doctor's 09:00-12:00 parent slot on 2024-11-15.
pub fn create_parent_slot(persistence: &mut Persistence) -> AvailabilitySlot {
    persistence
        .create_slot(
            AvailabilitySlot::new_manual(DOCTOR_ID, date("2024-11-15"), range("09:00", "12:00")),
            test_now(),
        )
        .unwrap()
}

pub fn routine_request() -> NewAssignment {
    NewAssignment {
        hospital_id: HOSPITAL_ID,
        doctor_id: DOCTOR_ID,
        patient_id: 42,
        availability_slot_id: None,
        priority: Priority::Routine,
        consultation_fee_cents: Some(10_000),
    }
}
