// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Test helper functions and fixtures.

use std::sync::Mutex;

use consult_sched::{DomainEvent, EngineConfig};
use consult_sched_audit::Cause;
use consult_sched_persistence::SqlitePersistence;
use time::OffsetDateTime;
use time::macros::datetime;

use crate::{
    AuthenticatedActor, CreateAssignmentRequest, CreateAssignmentResponse, CreateSlotRequest,
    Notifier, NotifyError, Role, SlotResponse, create_assignment, create_slot,
};

pub const DOCTOR_ID: i64 = 7;
pub const HOSPITAL_ID: i64 = 3;

pub fn create_test_admin() -> AuthenticatedActor {
    AuthenticatedActor::new(1, Role::Admin)
}

pub fn create_test_doctor() -> AuthenticatedActor {
    AuthenticatedActor::new(DOCTOR_ID, Role::Doctor)
}

pub fn create_test_hospital() -> AuthenticatedActor {
    AuthenticatedActor::new(HOSPITAL_ID, Role::Hospital)
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("api-req-456"), String::from("API request"))
}

pub fn test_now() -> OffsetDateTime {
    datetime!(2024-11-01 12:00 UTC)
}

pub fn test_config() -> EngineConfig {
    EngineConfig::default()
}

/// Collects delivered event kinds.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn kinds(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &DomainEvent) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event.kind().to_string());
        Ok(())
    }
}

/// Rejects every delivery.
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _event: &DomainEvent) -> Result<(), NotifyError> {
        Err(NotifyError::new("notification service unavailable"))
    }
}

/// Creates the doctor's 09:00-12:00 parent slot on 2024-11-15 as the doctor.
pub fn create_parent_slot(persistence: &mut SqlitePersistence) -> SlotResponse {
    create_slot(
        persistence,
        &CreateSlotRequest {
            doctor_id: DOCTOR_ID,
            slot_date: String::from("2024-11-15"),
            start_time: String::from("09:00"),
            end_time: String::from("12:00"),
            notes: None,
        },
        &create_test_doctor(),
        &create_test_cause(),
        test_now(),
    )
    .unwrap()
}

pub fn sub_slot_request(parent_slot_id: i64, start: &str, end: &str) -> CreateAssignmentRequest {
    CreateAssignmentRequest {
        hospital_id: None,
        doctor_id: DOCTOR_ID,
        patient_id: 42,
        slot_id: None,
        parent_slot_id: Some(parent_slot_id),
        start_time: Some(start.to_string()),
        end_time: Some(end.to_string()),
        priority: None,
        consultation_fee_cents: Some(10_000),
    }
}

/// Books 09:30-10:00 out of a fresh parent slot as the hospital.
pub fn create_pending_assignment(
    persistence: &mut SqlitePersistence,
    notifier: &dyn Notifier,
) -> CreateAssignmentResponse {
    let parent: SlotResponse = create_parent_slot(persistence);
    create_assignment(
        persistence,
        &test_config(),
        notifier,
        &sub_slot_request(parent.slot_id, "09:30", "10:00"),
        &create_test_hospital(),
        &create_test_cause(),
        test_now(),
    )
    .unwrap()
}
