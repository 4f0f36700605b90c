// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Tests for caller resolution and role/ownership authorization.

use consult_sched::Command;
use consult_sched_audit::Actor;
use consult_sched_domain::{
    ActorKind, Assignment, AssignmentStatus, AvailabilitySlot, CancelledBy, Priority, SlotStatus,
    TimeRange, parse_date,
};

use crate::tests::helpers::{
    DOCTOR_ID, HOSPITAL_ID, create_test_admin, create_test_doctor, create_test_hospital, test_now,
};
use crate::{AuthError, AuthenticatedActor, AuthorizationService, Role, authenticate};

fn pending_assignment() -> Assignment {
    Assignment {
        assignment_id: Some(11),
        hospital_id: HOSPITAL_ID,
        doctor_id: DOCTOR_ID,
        patient_id: 42,
        availability_slot_id: Some(5),
        status: AssignmentStatus::Pending,
        priority: Priority::Routine,
        requested_at: test_now(),
        expires_at: None,
        actual_start_time: None,
        actual_end_time: None,
        completed_at: None,
        cancelled_at: None,
        cancelled_by: None,
        cancellation_reason: None,
        treatment_notes: None,
        consultation_fee_cents: None,
    }
}

fn booked_slot() -> AvailabilitySlot {
    let mut slot: AvailabilitySlot = AvailabilitySlot::new_manual(
        DOCTOR_ID,
        parse_date("2024-11-15").unwrap(),
        TimeRange::parse("09:00", "10:00").unwrap(),
    );
    slot.slot_id = Some(5);
    slot.status = SlotStatus::Booked;
    slot.booked_by_hospital_id = Some(HOSPITAL_ID);
    slot
}

#[test]
fn test_authenticate_parses_role_case_insensitively() {
    let actor: AuthenticatedActor = authenticate(3, "Hospital").unwrap();
    assert_eq!(actor, AuthenticatedActor::new(3, Role::Hospital));
}

#[test]
fn test_authenticate_rejects_unknown_role_and_bad_id() {
    assert!(matches!(
        authenticate(3, "nurse"),
        Err(AuthError::AuthenticationFailed { .. })
    ));
    assert!(matches!(
        authenticate(0, "doctor"),
        Err(AuthError::AuthenticationFailed { .. })
    ));
}

#[test]
fn test_audit_actor_keeps_roles_apart() {
    let doctor: Actor = AuthenticatedActor::new(3, Role::Doctor).to_audit_actor();
    let hospital: Actor = AuthenticatedActor::new(3, Role::Hospital).to_audit_actor();
    assert_eq!(doctor.id, "doctor:3");
    assert_eq!(hospital.id, "hospital:3");
    assert_ne!(doctor, hospital);
}

#[test]
fn test_admin_cancels_as_system() {
    assert_eq!(create_test_admin().cancelled_by(), CancelledBy::System);
    assert_eq!(create_test_doctor().cancelled_by(), CancelledBy::Doctor);
    assert_eq!(create_test_hospital().cancelled_by(), CancelledBy::Hospital);
}

#[test]
fn test_admin_only_operations() {
    assert!(AuthorizationService::authorize_admin(&create_test_admin(), "run_expiry_sweep").is_ok());
    let result = AuthorizationService::authorize_admin(&create_test_doctor(), "run_expiry_sweep");
    assert_eq!(
        result,
        Err(AuthError::Unauthorized {
            action: String::from("run_expiry_sweep"),
            required_role: String::from("Admin"),
        })
    );
}

#[test]
fn test_doctor_manages_only_own_schedule() {
    let doctor: AuthenticatedActor = create_test_doctor();
    assert!(AuthorizationService::authorize_doctor_schedule(&doctor, DOCTOR_ID, "create_slot").is_ok());
    assert!(AuthorizationService::authorize_doctor_schedule(&doctor, 99, "create_slot").is_err());
    assert!(
        AuthorizationService::authorize_doctor_schedule(&create_test_hospital(), DOCTOR_ID, "create_slot")
            .is_err()
    );
    assert!(
        AuthorizationService::authorize_doctor_schedule(&create_test_admin(), 99, "create_slot").is_ok()
    );
}

#[test]
fn test_hospital_books_only_for_itself() {
    let hospital: AuthenticatedActor = create_test_hospital();
    assert!(AuthorizationService::authorize_hospital_booking(&hospital, HOSPITAL_ID, "book").is_ok());
    assert!(AuthorizationService::authorize_hospital_booking(&hospital, 8, "book").is_err());
    assert!(
        AuthorizationService::authorize_hospital_booking(&create_test_doctor(), HOSPITAL_ID, "book")
            .is_err()
    );
}

#[test]
fn test_usage_visible_to_self_and_admin() {
    let doctor: AuthenticatedActor = create_test_doctor();
    assert!(AuthorizationService::authorize_view_usage(&doctor, ActorKind::Doctor, DOCTOR_ID).is_ok());
    // Same number, different kind of actor.
    assert!(AuthorizationService::authorize_view_usage(&doctor, ActorKind::Hospital, DOCTOR_ID).is_err());
    assert!(
        AuthorizationService::authorize_view_usage(&create_test_admin(), ActorKind::Hospital, 99).is_ok()
    );
}

#[test]
fn test_only_the_doctor_answers_a_request() {
    let assignment: Assignment = pending_assignment();
    let hospital: AuthenticatedActor = create_test_hospital();
    let doctor: AuthenticatedActor = create_test_doctor();

    assert!(AuthorizationService::authorize_transition(&doctor, &assignment, &Command::Accept).is_ok());
    assert!(
        AuthorizationService::authorize_transition(&hospital, &assignment, &Command::Accept).is_err()
    );
    assert!(AuthorizationService::authorize_transition(
        &hospital,
        &assignment,
        &Command::Decline { reason: None }
    )
    .is_err());
    assert!(AuthorizationService::authorize_transition(
        &hospital,
        &assignment,
        &Command::Cancel {
            cancelled_by: CancelledBy::Hospital,
            reason: None
        }
    )
    .is_ok());
}

#[test]
fn test_outsiders_cannot_touch_an_assignment() {
    let assignment: Assignment = pending_assignment();
    let other_doctor: AuthenticatedActor = AuthenticatedActor::new(99, Role::Doctor);
    let other_hospital: AuthenticatedActor = AuthenticatedActor::new(98, Role::Hospital);

    assert!(
        AuthorizationService::authorize_transition(&other_doctor, &assignment, &Command::Accept)
            .is_err()
    );
    assert!(AuthorizationService::authorize_view_assignment(&other_hospital, &assignment).is_err());
    assert!(AuthorizationService::authorize_view_assignment(&create_test_admin(), &assignment).is_ok());
}

#[test]
fn test_release_allowed_for_owner_holder_and_admin() {
    let slot: AvailabilitySlot = booked_slot();
    assert!(AuthorizationService::authorize_release_slot(&create_test_doctor(), &slot).is_ok());
    assert!(AuthorizationService::authorize_release_slot(&create_test_hospital(), &slot).is_ok());
    assert!(AuthorizationService::authorize_release_slot(&create_test_admin(), &slot).is_ok());
    assert!(
        AuthorizationService::authorize_release_slot(&AuthenticatedActor::new(98, Role::Hospital), &slot)
            .is_err()
    );
}
