// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{EngineConfig, NewAssignment, TransitionContext, TransitionResult, apply_create};
use consult_sched_audit::{Actor, Cause};
use consult_sched_domain::{Assignment, Priority};
use time::OffsetDateTime;
use time::macros::datetime;

pub const NOW: OffsetDateTime = datetime!(2024-11-14 09:00 UTC);

pub fn create_test_actor() -> Actor {
    Actor::new(String::from("12"), String::from("hospital"))
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("req-456"), String::from("Consultation request"))
}

pub fn create_test_request(priority: Priority) -> NewAssignment {
    NewAssignment {
        hospital_id: 12,
        doctor_id: 7,
        patient_id: 301,
        availability_slot_id: Some(55),
        priority,
        consultation_fee_cents: Some(15_000),
    }
}

/// Creates a persisted-looking pending assignment.
pub fn create_pending_assignment(config: &EngineConfig) -> Assignment {
    let ctx: TransitionContext<'_> = TransitionContext::new(config, NOW);
    let result: TransitionResult = apply_create(
        &ctx,
        create_test_request(Priority::Routine),
        create_test_actor(),
        create_test_cause(),
    )
    .unwrap()
    .with_assignment_id(900);
    result.assignment
}
