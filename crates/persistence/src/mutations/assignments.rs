// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Assignment creation and transitions.
//!
//! Transitions are compare-and-swap: the row is updated only while its
//! stored status still equals the status the transition was computed from.

use consult_sched::{
    Command, EngineConfig, NewAssignment, SlotEffect, TransitionContext, TransitionResult, apply,
    apply_create, slot_start_instant,
};
use consult_sched_audit::{Actor, Cause};
use consult_sched_domain::{
    ActorKind, Assignment, AssignmentStatus, AvailabilitySlot, CancelledBy, DomainError, MonthKey,
    TimeRange, format_instant, local_date,
};
use diesel::SqliteConnection;
use diesel::prelude::*;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::backend::PersistenceBackend;
use crate::diesel_schema::{assignment_payments, assignments};
use crate::error::PersistenceError;
use crate::mutations::{slots, usage};
use crate::queries;

/// How a new assignment obtains its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRequest {
    /// Book an existing free slot whole.
    Existing(i64),
    /// Carve a booked sub-slot out of a parent.
    SubSlot {
        parent_slot_id: i64,
        range: TimeRange,
    },
}

/// A committed assignment creation and the slot it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedAssignment {
    pub result: TransitionResult,
    pub slot: AvailabilitySlot,
}

fn optional_instant(value: Option<OffsetDateTime>) -> Result<Option<String>, PersistenceError> {
    Ok(value.map(format_instant).transpose()?)
}

/// Inserts an assignment row and returns its ID.
///
/// # Errors
///
/// Returns `Conflict` if another active assignment already holds the slot,
/// or an error if the insert fails.
pub fn insert_assignment(
    conn: &mut SqliteConnection,
    assignment: &Assignment,
    now: &str,
) -> Result<i64, PersistenceError> {
    diesel::insert_into(assignments::table)
        .values((
            assignments::hospital_id.eq(assignment.hospital_id),
            assignments::doctor_id.eq(assignment.doctor_id),
            assignments::patient_id.eq(assignment.patient_id),
            assignments::availability_slot_id.eq(assignment.availability_slot_id),
            assignments::status.eq(assignment.status.as_str()),
            assignments::priority.eq(assignment.priority.as_str()),
            assignments::requested_at.eq(format_instant(assignment.requested_at)?),
            assignments::expires_at.eq(optional_instant(assignment.expires_at)?),
            assignments::consultation_fee_cents.eq(assignment.consultation_fee_cents),
            assignments::updated_at.eq(now),
        ))
        .execute(conn)?;

    conn.get_last_insert_rowid()
}

/// Writes a transitioned assignment if its stored status is still `expected`.
///
/// Returns the number of rows updated: 1 on success, 0 if another writer
/// moved the assignment first.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn update_assignment_if_status(
    conn: &mut SqliteConnection,
    assignment: &Assignment,
    expected: AssignmentStatus,
    now: &str,
) -> Result<usize, PersistenceError> {
    Ok(diesel::update(
        assignments::table
            .filter(assignments::assignment_id.eq(assignment.id()))
            .filter(assignments::status.eq(expected.as_str())),
    )
    .set((
        assignments::status.eq(assignment.status.as_str()),
        assignments::actual_start_time.eq(optional_instant(assignment.actual_start_time)?),
        assignments::actual_end_time.eq(optional_instant(assignment.actual_end_time)?),
        assignments::completed_at.eq(optional_instant(assignment.completed_at)?),
        assignments::cancelled_at.eq(optional_instant(assignment.cancelled_at)?),
        assignments::cancelled_by
            .eq(assignment.cancelled_by.as_ref().map(CancelledBy::as_str)),
        assignments::cancellation_reason.eq(&assignment.cancellation_reason),
        assignments::treatment_notes.eq(&assignment.treatment_notes),
        assignments::updated_at.eq(now),
    ))
    .execute(conn)?)
}

/// Creates the payment settlement for a completed assignment.
///
/// A second call for the same assignment is ignored. Returns `true` if a row
/// was written.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_payment_once(
    conn: &mut SqliteConnection,
    assignment_id: i64,
    fee_cents: i64,
    now: &str,
) -> Result<bool, PersistenceError> {
    let inserted: usize = diesel::insert_or_ignore_into(assignment_payments::table)
        .values((
            assignment_payments::assignment_id.eq(assignment_id),
            assignment_payments::consultation_fee_cents.eq(fee_cents),
            assignment_payments::platform_commission_cents.eq(0_i64),
            assignment_payments::doctor_payout_cents.eq(fee_cents),
            assignment_payments::payment_status.eq("pending"),
            assignment_payments::created_at.eq(now),
        ))
        .execute(conn)?;
    Ok(inserted > 0)
}

/// Creates an assignment, reserving its slot and both parties' quota.
///
/// Every step writes inside the caller's transaction, so any failure leaves
/// no usage increment, slot reservation, or assignment behind.
///
/// # Arguments
///
/// * `conn` - A connection holding an immediate transaction
/// * `config` - Engine configuration
/// * `request` - The assignment request; its slot ID is replaced by the reserved slot
/// * `slot_request` - How to obtain the slot
/// * `actor` - The actor performing this action
/// * `cause` - The cause or reason for this action
/// * `now` - The current instant
///
/// # Errors
///
/// Returns a domain error if either quota is exhausted, the slot is not free,
/// the slot belongs to another doctor, or the fee is negative.
pub fn create_assignment(
    conn: &mut SqliteConnection,
    config: &EngineConfig,
    mut request: NewAssignment,
    slot_request: SlotRequest,
    actor: Actor,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<CreatedAssignment, PersistenceError> {
    let month: MonthKey = MonthKey::from_date(local_date(now, config.timezone)?);
    usage::check_and_reserve(
        conn,
        config,
        ActorKind::Hospital,
        request.hospital_id,
        month,
        now,
    )?;
    usage::check_and_reserve(
        conn,
        config,
        ActorKind::Doctor,
        request.doctor_id,
        month,
        now,
    )?;

    let slot: AvailabilitySlot = match slot_request {
        SlotRequest::Existing(slot_id) => slots::book_slot_directly(
            conn,
            slot_id,
            request.doctor_id,
            request.hospital_id,
            now,
        )?,
        SlotRequest::SubSlot {
            parent_slot_id,
            range,
        } => {
            let parent: AvailabilitySlot = queries::slots::get_slot(conn, parent_slot_id)?;
            if parent.doctor_id != request.doctor_id {
                return Err(PersistenceError::Domain(DomainError::SlotDoctorMismatch {
                    slot_id: parent_slot_id,
                    doctor_id: request.doctor_id,
                }));
            }
            slots::reserve_sub_slot(conn, parent_slot_id, request.hospital_id, range, now)?
        }
    };

    request.availability_slot_id = slot.slot_id;
    let ctx: TransitionContext<'_> = TransitionContext::new(config, now);
    let result: TransitionResult = apply_create(&ctx, request, actor, cause)?;

    let assignment_id: i64 = insert_assignment(conn, &result.assignment, &format_instant(now)?)?;
    let result: TransitionResult = result.with_assignment_id(assignment_id);

    info!(
        assignment_id,
        hospital_id = result.assignment.hospital_id,
        doctor_id = result.assignment.doctor_id,
        slot_id = slot.id(),
        priority = result.assignment.priority.as_str(),
        "Created assignment"
    );
    Ok(CreatedAssignment { result, slot })
}

/// Applies a transition command to a stored assignment.
///
/// # Errors
///
/// Returns `NotFound` if the assignment does not exist, or the domain error
/// the lifecycle raises. If the stored status changed underneath, the error
/// describes the move from the status now stored.
pub fn transition_assignment(
    conn: &mut SqliteConnection,
    config: &EngineConfig,
    assignment_id: i64,
    command: Command,
    actor: Actor,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<TransitionResult, PersistenceError> {
    let current: Assignment = queries::assignments::get_assignment(conn, assignment_id)?;

    let slot_start: Option<OffsetDateTime> = match current.availability_slot_id {
        Some(slot_id) => {
            let slot: AvailabilitySlot = queries::slots::get_slot(conn, slot_id)?;
            Some(slot_start_instant(config, &slot)?)
        }
        None => None,
    };

    let target: AssignmentStatus = command.target_status();
    let ctx: TransitionContext<'_> = TransitionContext::new(config, now).with_slot_start(slot_start);
    let result: TransitionResult = apply(&ctx, &current, command, actor, cause)?;

    let now_str: String = format_instant(now)?;
    let updated: usize =
        update_assignment_if_status(conn, &result.assignment, current.status, &now_str)?;
    if updated == 0 {
        let latest: Assignment = queries::assignments::get_assignment(conn, assignment_id)?;
        latest.status.validate_transition(target)?;
        return Err(PersistenceError::Conflict(format!(
            "Assignment {assignment_id} changed from {} while transitioning",
            current.status
        )));
    }

    if result.slot_effect == SlotEffect::Release
        && let Some(slot_id) = current.availability_slot_id
    {
        slots::release_slot(conn, slot_id, &now_str)?;
    }

    if result.assignment.status == AssignmentStatus::Completed
        && let Some(fee_cents) = result.assignment.consultation_fee_cents
    {
        let created: bool = insert_payment_once(conn, assignment_id, fee_cents, &now_str)?;
        debug!(assignment_id, fee_cents, created, "Payment settlement recorded");
    }

    info!(
        assignment_id,
        from = current.status.as_str(),
        to = result.assignment.status.as_str(),
        action = %result.audit_event.action.name,
        "Transitioned assignment"
    );
    Ok(result)
}
