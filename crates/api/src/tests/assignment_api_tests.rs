// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Tests for assignment handlers, notifications, and the audit trail.

use consult_sched_persistence::SqlitePersistence;
use time::Duration;

use crate::tests::helpers::{
    DOCTOR_ID, FailingNotifier, RecordingNotifier, create_parent_slot, create_pending_assignment,
    create_test_admin, create_test_cause, create_test_doctor, create_test_hospital,
    sub_slot_request, test_config, test_now,
};
use crate::{
    ApiError, AssignmentResponse, AuditEventResponse, AuthenticatedActor, Capability,
    CreateAssignmentRequest, CreateAssignmentResponse, Role, SlotResponse, SweepResponse,
    TransitionAssignmentRequest, TransitionAssignmentResponse, create_assignment, get_assignment,
    get_slot, list_assignments_for_slot, list_audit_events, list_sub_slots, run_expiry_sweep,
    sweep_expired_assignments, transition_assignment,
};

fn status_request(status: &str) -> TransitionAssignmentRequest {
    TransitionAssignmentRequest {
        status: status.to_string(),
        reason: None,
        treatment_notes: None,
    }
}

fn transition(
    persistence: &mut SqlitePersistence,
    assignment_id: i64,
    status: &str,
    actor: &AuthenticatedActor,
) -> Result<TransitionAssignmentResponse, ApiError> {
    transition_assignment(
        persistence,
        &test_config(),
        &RecordingNotifier::default(),
        assignment_id,
        &status_request(status),
        actor,
        &create_test_cause(),
        test_now(),
    )
}

#[test]
fn test_hospital_creates_assignment_on_sub_slot() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let notifier = RecordingNotifier::default();

    let created: CreateAssignmentResponse = create_pending_assignment(&mut persistence, &notifier);

    let assignment: &AssignmentResponse = &created.assignment;
    assert_eq!(assignment.status, "pending");
    assert_eq!(assignment.priority, "routine");
    assert_eq!(assignment.expires_at.as_deref(), Some("2024-11-02T12:00:00Z"));
    assert_eq!(assignment.availability_slot_id, Some(created.slot.slot_id));
    assert_eq!(created.slot.status, "booked");
    assert_eq!(notifier.kinds(), vec!["assignment_created"]);

    // The creating hospital may only cancel at this point.
    assert_eq!(assignment.capabilities.can_accept, Capability::Denied);
    assert_eq!(assignment.capabilities.can_cancel, Capability::Allowed);

    let trail: Vec<AuditEventResponse> = list_audit_events(
        &mut persistence,
        "assignment",
        assignment.assignment_id,
        &create_test_admin(),
    )
    .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, "CreateAssignment");
    assert_eq!(trail[0].actor_id, "hospital:3");
}

#[test]
fn test_slot_selection_must_be_unambiguous() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let parent: SlotResponse = create_parent_slot(&mut persistence);

    let mut request: CreateAssignmentRequest = sub_slot_request(parent.slot_id, "09:30", "10:00");
    request.slot_id = Some(parent.slot_id);
    let result = create_assignment(
        &mut persistence,
        &test_config(),
        &RecordingNotifier::default(),
        &request,
        &create_test_hospital(),
        &create_test_cause(),
        test_now(),
    );
    assert!(matches!(result, Err(ApiError::InvalidInput { ref field, .. }) if field == "slot_id"));

    let mut request: CreateAssignmentRequest = sub_slot_request(parent.slot_id, "09:30", "10:00");
    request.end_time = None;
    let result = create_assignment(
        &mut persistence,
        &test_config(),
        &RecordingNotifier::default(),
        &request,
        &create_test_hospital(),
        &create_test_cause(),
        test_now(),
    );
    assert!(matches!(result, Err(ApiError::InvalidInput { .. })));
}

#[test]
fn test_doctor_cannot_create_assignment() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let parent: SlotResponse = create_parent_slot(&mut persistence);
    let mut request: CreateAssignmentRequest = sub_slot_request(parent.slot_id, "09:30", "10:00");
    request.hospital_id = Some(3);
    let result = create_assignment(
        &mut persistence,
        &test_config(),
        &RecordingNotifier::default(),
        &request,
        &create_test_doctor(),
        &create_test_cause(),
        test_now(),
    );
    assert!(matches!(result, Err(ApiError::Unauthorized { .. })));
}

#[test]
fn test_negative_fee_is_rejected_without_writes() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let parent: SlotResponse = create_parent_slot(&mut persistence);
    let mut request: CreateAssignmentRequest = sub_slot_request(parent.slot_id, "09:30", "10:00");
    request.consultation_fee_cents = Some(-1);

    let result = create_assignment(
        &mut persistence,
        &test_config(),
        &RecordingNotifier::default(),
        &request,
        &create_test_hospital(),
        &create_test_cause(),
        test_now(),
    );
    assert!(matches!(result, Err(ApiError::InvalidInput { .. })));
    assert!(
        list_sub_slots(&mut persistence, parent.slot_id)
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_doctor_accepts_then_completes_with_payment() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let created: CreateAssignmentResponse =
        create_pending_assignment(&mut persistence, &RecordingNotifier::default());
    let assignment_id: i64 = created.assignment.assignment_id;

    let accepted: TransitionAssignmentResponse =
        transition(&mut persistence, assignment_id, "accepted", &create_test_doctor()).unwrap();
    assert_eq!(accepted.previous_status, "pending");
    assert_eq!(accepted.assignment.status, "accepted");
    assert!(!accepted.slot_released);
    assert_eq!(accepted.assignment.capabilities.can_complete, Capability::Allowed);

    let completed: TransitionAssignmentResponse = transition_assignment(
        &mut persistence,
        &test_config(),
        &RecordingNotifier::default(),
        assignment_id,
        &TransitionAssignmentRequest {
            status: String::from("completed"),
            reason: None,
            treatment_notes: Some(String::from("Follow up in two weeks")),
        },
        &create_test_doctor(),
        &create_test_cause(),
        test_now(),
    )
    .unwrap();
    assert_eq!(completed.assignment.status, "completed");
    assert_eq!(
        completed.assignment.treatment_notes.as_deref(),
        Some("Follow up in two weeks")
    );
    let payment = completed.assignment.payment.unwrap();
    assert_eq!(payment.doctor_payout_cents, 10_000);
    assert_eq!(payment.platform_commission_cents, 0);
    assert_eq!(payment.payment_status, "pending");

    let again = transition(&mut persistence, assignment_id, "completed", &create_test_doctor());
    assert!(matches!(again, Err(ApiError::AlreadyFinal { .. })));
}

#[test]
fn test_hospital_cannot_accept() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let created: CreateAssignmentResponse =
        create_pending_assignment(&mut persistence, &RecordingNotifier::default());

    let result = transition(
        &mut persistence,
        created.assignment.assignment_id,
        "accepted",
        &create_test_hospital(),
    );
    assert!(matches!(result, Err(ApiError::Unauthorized { .. })));
}

#[test]
fn test_completing_pending_is_invalid_transition() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let created: CreateAssignmentResponse =
        create_pending_assignment(&mut persistence, &RecordingNotifier::default());

    let result = transition(
        &mut persistence,
        created.assignment.assignment_id,
        "completed",
        &create_test_doctor(),
    );
    assert!(matches!(result, Err(ApiError::InvalidTransition { .. })));

    let result = transition(
        &mut persistence,
        created.assignment.assignment_id,
        "pending",
        &create_test_doctor(),
    );
    assert!(matches!(result, Err(ApiError::InvalidTransition { .. })));
}

#[test]
fn test_decline_releases_slot_and_notifies() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let created: CreateAssignmentResponse =
        create_pending_assignment(&mut persistence, &RecordingNotifier::default());
    let notifier = RecordingNotifier::default();

    let declined: TransitionAssignmentResponse = transition_assignment(
        &mut persistence,
        &test_config(),
        &notifier,
        created.assignment.assignment_id,
        &TransitionAssignmentRequest {
            status: String::from("declined"),
            reason: Some(String::from("Fully booked")),
            treatment_notes: None,
        },
        &create_test_doctor(),
        &create_test_cause(),
        test_now(),
    )
    .unwrap();

    assert!(declined.slot_released);
    assert_eq!(declined.assignment.cancelled_by.as_deref(), Some("doctor"));
    assert_eq!(notifier.kinds(), vec!["assignment_declined"]);
    let slot: SlotResponse = get_slot(&mut persistence, created.slot.slot_id).unwrap();
    assert_eq!(slot.status, "available");
}

#[test]
fn test_failed_notification_does_not_undo_transition() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let created: CreateAssignmentResponse =
        create_pending_assignment(&mut persistence, &FailingNotifier);

    let accepted = transition_assignment(
        &mut persistence,
        &test_config(),
        &FailingNotifier,
        created.assignment.assignment_id,
        &status_request("accepted"),
        &create_test_doctor(),
        &create_test_cause(),
        test_now(),
    )
    .unwrap();
    assert_eq!(accepted.assignment.status, "accepted");

    let stored: AssignmentResponse = get_assignment(
        &mut persistence,
        &test_config(),
        created.assignment.assignment_id,
        &create_test_doctor(),
        test_now(),
    )
    .unwrap();
    assert_eq!(stored.status, "accepted");
}

#[test]
fn test_participant_cancel_inside_notice_window_is_refused() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let created: CreateAssignmentResponse =
        create_pending_assignment(&mut persistence, &RecordingNotifier::default());
    // Slot starts 2024-11-15 09:30 UTC; twelve hours before is inside 24h notice.
    let late = time::macros::datetime!(2024-11-14 21:30 UTC);

    let result = transition_assignment(
        &mut persistence,
        &test_config(),
        &RecordingNotifier::default(),
        created.assignment.assignment_id,
        &status_request("cancelled"),
        &create_test_hospital(),
        &create_test_cause(),
        late,
    );
    assert_eq!(
        result.unwrap_err(),
        ApiError::CancellationWindowClosed { notice_hours: 24 }
    );

    let cancelled: TransitionAssignmentResponse = transition_assignment(
        &mut persistence,
        &test_config(),
        &RecordingNotifier::default(),
        created.assignment.assignment_id,
        &status_request("cancelled"),
        &create_test_admin(),
        &create_test_cause(),
        late,
    )
    .unwrap();
    assert_eq!(cancelled.assignment.cancelled_by.as_deref(), Some("system"));
}

#[test]
fn test_outsider_cannot_view_assignment() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let created: CreateAssignmentResponse =
        create_pending_assignment(&mut persistence, &RecordingNotifier::default());

    let result = get_assignment(
        &mut persistence,
        &test_config(),
        created.assignment.assignment_id,
        &AuthenticatedActor::new(98, Role::Hospital),
        test_now(),
    );
    assert!(matches!(result, Err(ApiError::Unauthorized { .. })));

    let doctor_view: AssignmentResponse = get_assignment(
        &mut persistence,
        &test_config(),
        created.assignment.assignment_id,
        &create_test_doctor(),
        test_now(),
    )
    .unwrap();
    assert_eq!(doctor_view.capabilities.can_accept, Capability::Allowed);
    assert_eq!(doctor_view.capabilities.can_complete, Capability::Denied);
}

#[test]
fn test_doctor_lists_slot_assignment_history() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let created: CreateAssignmentResponse =
        create_pending_assignment(&mut persistence, &RecordingNotifier::default());

    let history: Vec<AssignmentResponse> = list_assignments_for_slot(
        &mut persistence,
        &test_config(),
        created.slot.slot_id,
        &create_test_doctor(),
        test_now(),
    )
    .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].doctor_id, DOCTOR_ID);
}

#[test]
fn test_sweep_expires_overdue_requests() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let created: CreateAssignmentResponse =
        create_pending_assignment(&mut persistence, &RecordingNotifier::default());
    let notifier = RecordingNotifier::default();

    let denied = run_expiry_sweep(
        &mut persistence,
        &test_config(),
        &notifier,
        &create_test_doctor(),
        test_now() + Duration::hours(25),
    );
    assert!(matches!(denied, Err(ApiError::Unauthorized { .. })));

    let swept: SweepResponse = run_expiry_sweep(
        &mut persistence,
        &test_config(),
        &notifier,
        &create_test_admin(),
        test_now() + Duration::hours(25),
    )
    .unwrap();
    assert_eq!(swept.cancelled, 1);
    assert_eq!(swept.released, 1);
    assert_eq!(
        swept.cancelled_assignment_ids,
        vec![created.assignment.assignment_id]
    );
    assert_eq!(notifier.kinds(), vec!["assignment_expired"]);

    let trail: Vec<AuditEventResponse> = list_audit_events(
        &mut persistence,
        "assignment",
        created.assignment.assignment_id,
        &create_test_admin(),
    )
    .unwrap();
    assert_eq!(trail.last().unwrap().action, "ExpireAssignment");

    // A second run finds nothing.
    let again: SweepResponse = sweep_expired_assignments(
        &mut persistence,
        &test_config(),
        &notifier,
        test_now() + Duration::hours(26),
    )
    .unwrap();
    assert_eq!(again.found, 0);
}
