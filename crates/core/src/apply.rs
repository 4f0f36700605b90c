// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::command::{Command, EXPIRY_REASON, NewAssignment};
use crate::error::CoreError;
use crate::event::{AssignmentNotice, DomainEvent};
use crate::state::{SlotEffect, TransitionContext, TransitionResult, assignment_snapshot};
use consult_sched_audit::{Action, Actor, AuditEvent, Cause, EntityRef, EntityType, StateSnapshot};
use consult_sched_domain::{
    Assignment, AssignmentStatus, CancelledBy, DomainError, format_instant,
    validate_consultation_fee,
};
use time::OffsetDateTime;

/// Slot effect, audit details, and event constructor for one transition.
type Outcome = (SlotEffect, String, fn(AssignmentNotice) -> DomainEvent);

/// Builds a new pending assignment from a hospital's request.
///
/// The assignment ID is not known yet; the caller fills it in with
/// [`TransitionResult::with_assignment_id`] after insertion.
///
/// # Arguments
///
/// * `ctx` - Engine configuration and the current instant
/// * `request` - The validated request
/// * `actor` - The actor performing this action
/// * `cause` - The cause or reason for this action
///
/// # Errors
///
/// Returns an error if the consultation fee is negative.
pub fn apply_create(
    ctx: &TransitionContext<'_>,
    request: NewAssignment,
    actor: Actor,
    cause: Cause,
) -> Result<TransitionResult, CoreError> {
    validate_consultation_fee(request.consultation_fee_cents)?;

    let expires_at: Option<OffsetDateTime> = ctx
        .config
        .response_window(request.priority)
        .map(|window| ctx.now + window);

    let assignment: Assignment = Assignment {
        assignment_id: None,
        hospital_id: request.hospital_id,
        doctor_id: request.doctor_id,
        patient_id: request.patient_id,
        availability_slot_id: request.availability_slot_id,
        status: AssignmentStatus::Pending,
        priority: request.priority,
        requested_at: ctx.now,
        expires_at,
        actual_start_time: None,
        actual_end_time: None,
        completed_at: None,
        cancelled_at: None,
        cancelled_by: None,
        cancellation_reason: None,
        treatment_notes: None,
        consultation_fee_cents: request.consultation_fee_cents,
    };

    let details: String = match expires_at {
        Some(deadline) => format!(
            "Requested doctor {} for patient {} ({}), respond by {}",
            assignment.doctor_id,
            assignment.patient_id,
            assignment.priority,
            format_instant(deadline)?
        ),
        None => format!(
            "Requested doctor {} for patient {} ({}), no response deadline",
            assignment.doctor_id, assignment.patient_id, assignment.priority
        ),
    };

    let audit_event: AuditEvent = AuditEvent::new(
        actor,
        cause,
        Action::new(String::from("CreateAssignment"), Some(details)),
        EntityRef::new(EntityType::Assignment, 0),
        StateSnapshot::empty(),
        assignment_snapshot(&assignment),
    );
    let domain_event: DomainEvent =
        DomainEvent::AssignmentCreated(AssignmentNotice::from_assignment(&assignment, ctx.now));

    Ok(TransitionResult {
        assignment,
        previous_status: None,
        slot_effect: SlotEffect::Hold,
        audit_event,
        domain_event,
    })
}

/// Applies a transition command to an assignment.
///
/// This function is pure: it validates the move against the lifecycle and
/// returns the updated assignment. The persistence layer commits it only if
/// the stored status still equals `result.previous_status`.
///
/// # Arguments
///
/// * `ctx` - Engine configuration, the current instant, and the slot start
/// * `current` - The assignment as currently stored
/// * `command` - The transition to apply
/// * `actor` - The actor performing this action
/// * `cause` - The cause or reason for this action
///
/// # Errors
///
/// Returns an error if:
/// - The assignment is terminal (`AssignmentAlreadyFinal`)
/// - The lifecycle forbids the move (`InvalidStatusTransition`)
/// - Acceptance is attempted at or after the deadline (`AssignmentExpired`)
/// - A participant cancels inside the notice window (`CancellationWindowClosed`)
#[allow(clippy::too_many_lines)]
pub fn apply(
    ctx: &TransitionContext<'_>,
    current: &Assignment,
    command: Command,
    actor: Actor,
    cause: Cause,
) -> Result<TransitionResult, CoreError> {
    let target: AssignmentStatus = command.target_status();
    current.status.validate_transition(target)?;

    let action_name: &'static str = command.action_name();
    let now: OffsetDateTime = ctx.now;
    let mut next: Assignment = current.clone();
    next.status = target;

    let (slot_effect, details, event): Outcome = match command {
        Command::Accept => {
            if current.is_expired_at(now) {
                let deadline: OffsetDateTime = current.expires_at.unwrap_or(now);
                return Err(CoreError::DomainViolation(DomainError::AssignmentExpired {
                    expires_at: format_instant(deadline)?,
                }));
            }
            next.actual_start_time = Some(now);
            (
                SlotEffect::Hold,
                String::from("Doctor accepted the request"),
                DomainEvent::AssignmentAccepted,
            )
        }
        Command::Decline { reason } => {
            next.cancelled_at = Some(now);
            next.cancelled_by = Some(CancelledBy::Doctor);
            next.cancellation_reason.clone_from(&reason);
            (
                SlotEffect::Release,
                format!(
                    "Doctor declined: {}",
                    reason.as_deref().unwrap_or("no reason given")
                ),
                DomainEvent::AssignmentDeclined,
            )
        }
        Command::Complete { treatment_notes } => {
            next.completed_at = Some(now);
            next.actual_end_time = Some(now);
            if treatment_notes.is_some() {
                next.treatment_notes = treatment_notes;
            }
            (
                SlotEffect::Hold,
                String::from("Consultation completed"),
                DomainEvent::AssignmentCompleted,
            )
        }
        Command::Cancel {
            cancelled_by,
            reason,
        } => {
            if cancelled_by != CancelledBy::System
                && let Some(slot_start) = ctx.slot_start
                && slot_start - now < ctx.config.cancellation_notice()
            {
                return Err(CoreError::DomainViolation(
                    DomainError::CancellationWindowClosed {
                        notice_hours: ctx.config.cancellation_notice_hours,
                    },
                ));
            }
            next.cancelled_at = Some(now);
            next.cancelled_by = Some(cancelled_by);
            next.cancellation_reason.clone_from(&reason);
            (
                SlotEffect::Release,
                format!(
                    "Cancelled by {}: {}",
                    cancelled_by.as_str(),
                    reason.as_deref().unwrap_or("no reason given")
                ),
                DomainEvent::AssignmentCancelled,
            )
        }
        Command::Expire => {
            if current.status != AssignmentStatus::Pending {
                return Err(CoreError::DomainViolation(
                    DomainError::InvalidStatusTransition {
                        from: current.status.as_str().to_string(),
                        to: target.as_str().to_string(),
                        reason: String::from("only pending assignments expire"),
                    },
                ));
            }
            if !current.is_expired_at(now) {
                return Err(CoreError::DomainViolation(
                    DomainError::InvalidStatusTransition {
                        from: current.status.as_str().to_string(),
                        to: target.as_str().to_string(),
                        reason: String::from("response window has not elapsed"),
                    },
                ));
            }
            next.cancelled_at = Some(now);
            next.cancelled_by = Some(CancelledBy::System);
            next.cancellation_reason = Some(String::from(EXPIRY_REASON));
            (
                SlotEffect::Release,
                String::from(EXPIRY_REASON),
                DomainEvent::AssignmentExpired,
            )
        }
    };

    let domain_event: DomainEvent = event(AssignmentNotice::from_assignment(&next, now));

    let audit_event: AuditEvent = AuditEvent::new(
        actor,
        cause,
        Action::new(String::from(action_name), Some(details)),
        EntityRef::new(EntityType::Assignment, current.id()),
        assignment_snapshot(current),
        assignment_snapshot(&next),
    );

    Ok(TransitionResult {
        assignment: next,
        previous_status: Some(current.status),
        slot_effect,
        audit_event,
        domain_event,
    })
}
