// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API handlers.
//!
//! Each handler authorizes the caller, parses its request, performs the
//! operation through persistence, and then, after commit, records the
//! audit event and delivers the domain event. Neither of the last two can
//! change the outcome of an operation that has already committed.

use chrono::{NaiveDate, Weekday};
use consult_sched::{
    Command, EngineConfig, ExpansionRequest, ExpansionSummary, MonthlyResetSummary, NewAssignment,
    SlotEffect, TransitionResult, UsageStatus, slot_start_instant,
};
use consult_sched_audit::{Action, Actor, AuditEvent, Cause, EntityRef, EntityType, StateSnapshot};
use consult_sched_domain::{
    ActorKind, Assignment, AssignmentStatus, AvailabilitySlot, AvailabilityTemplate, DomainError,
    LeaveRecord, LeaveType, MonthKey, PlanSubscription, PlanTier, Priority, RecurrencePattern,
    SubscriptionStatus, TimeRange, format_date, local_date, parse_date, parse_weekday_tag,
};
use consult_sched_persistence::{
    CreatedAssignment, PaymentRecord, SlotRequest, SqlitePersistence, SubSlotLinkage,
};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::auth::{AuthenticatedActor, AuthorizationService, Role};
use crate::capabilities::compute_assignment_capabilities;
use crate::error::{ApiError, translate_domain_error};
use crate::notifier::{Notifier, deliver};
use crate::request_response::{
    AssignmentCapabilities, AssignmentResponse, AuditEventResponse, CreateAssignmentRequest,
    CreateAssignmentResponse, CreateSlotRequest, CreateTemplateRequest, ExpandTemplatesRequest,
    LeaveResponse, RecordLeaveRequest, ReserveSubSlotRequest, ResetUsageRequest,
    SetSubscriptionRequest, SlotResponse, SubSlotResponse, SubscriptionResponse, SweepResponse,
    TemplateResponse, TransitionAssignmentRequest, TransitionAssignmentResponse,
};

// ============================================================================
// Helpers
// ============================================================================

fn parsed<T>(result: Result<T, DomainError>) -> Result<T, ApiError> {
    result.map_err(translate_domain_error)
}

fn parse_optional_date(value: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    parsed(value.map(parse_date).transpose())
}

fn current_month(config: &EngineConfig, now: OffsetDateTime) -> Result<MonthKey, ApiError> {
    Ok(MonthKey::from_date(parsed(local_date(now, config.timezone))?))
}

fn parse_month(
    value: Option<&str>,
    config: &EngineConfig,
    now: OffsetDateTime,
) -> Result<MonthKey, ApiError> {
    match value {
        Some(month) => parsed(month.parse::<MonthKey>()),
        None => current_month(config, now),
    }
}

/// Persists an audit event after commit; a failure is logged, not returned.
fn record_audit(persistence: &mut SqlitePersistence, event: &AuditEvent, now: OffsetDateTime) {
    if let Err(e) = persistence.persist_audit_event(event, now) {
        warn!(
            action = %event.action.name,
            entity_type = event.entity.entity_type.as_str(),
            entity_id = event.entity.entity_id,
            error = %e,
            "Failed to persist audit event"
        );
    }
}

/// Records the audit event and delivers the domain event of a committed transition.
fn publish(
    persistence: &mut SqlitePersistence,
    notifier: &dyn Notifier,
    result: &TransitionResult,
    now: OffsetDateTime,
) {
    record_audit(persistence, &result.audit_event, now);
    deliver(notifier, &result.domain_event);
}

fn slot_snapshot(slot: &AvailabilitySlot) -> StateSnapshot {
    StateSnapshot::new(format!(
        "status={},doctor={},date={},range={},hospital={}",
        slot.status,
        slot.doctor_id,
        format_date(slot.slot_date),
        slot.range,
        slot.booked_by_hospital_id
            .map_or_else(|| String::from("none"), |id| id.to_string()),
    ))
}

fn template_snapshot(template: &AvailabilityTemplate) -> StateSnapshot {
    StateSnapshot::new(format!(
        "name={},pattern={},range={},active={}",
        template.name,
        template.pattern.as_str(),
        template.range,
        template.is_active
    ))
}

fn mutation_event(
    actor: &AuthenticatedActor,
    cause: &Cause,
    action: &str,
    details: Option<String>,
    entity: EntityRef,
    before: StateSnapshot,
    after: StateSnapshot,
) -> AuditEvent {
    AuditEvent::new(
        actor.to_audit_actor(),
        cause.clone(),
        Action::new(action.to_string(), details),
        entity,
        before,
        after,
    )
}

/// Resolves the hospital a booking is made for.
///
/// Hospitals book for themselves. Admins must name the hospital.
fn resolve_hospital(
    actor: &AuthenticatedActor,
    requested: Option<i64>,
    action: &str,
) -> Result<i64, ApiError> {
    let hospital_id: i64 = match (actor.role, requested) {
        (Role::Hospital, requested) => requested.unwrap_or(actor.id),
        (_, Some(id)) => id,
        (_, None) => {
            return Err(ApiError::InvalidInput {
                field: String::from("hospital_id"),
                message: String::from("hospital_id is required"),
            });
        }
    };
    AuthorizationService::authorize_hospital_booking(actor, hospital_id, action)?;
    Ok(hospital_id)
}

/// Builds an assignment response with the caller's capabilities.
fn assignment_view(
    persistence: &mut SqlitePersistence,
    config: &EngineConfig,
    actor: &AuthenticatedActor,
    assignment: &Assignment,
    slot: Option<&AvailabilitySlot>,
    now: OffsetDateTime,
) -> Result<AssignmentResponse, ApiError> {
    let slot_start: Option<OffsetDateTime> = match (slot, assignment.availability_slot_id) {
        (Some(slot), _) => Some(parsed(slot_start_instant(config, slot))?),
        (None, Some(slot_id)) => {
            let stored: AvailabilitySlot = persistence.get_slot(slot_id)?;
            Some(parsed(slot_start_instant(config, &stored))?)
        }
        (None, None) => None,
    };
    let payment: Option<PaymentRecord> = persistence.get_payment(assignment.id())?;
    let capabilities: AssignmentCapabilities =
        compute_assignment_capabilities(actor, assignment, config, slot_start, now);
    AssignmentResponse::build(assignment, payment, capabilities)
}

fn command_for(
    actor: &AuthenticatedActor,
    current: &Assignment,
    request: &TransitionAssignmentRequest,
) -> Result<Command, ApiError> {
    let target: AssignmentStatus = parsed(request.status.parse::<AssignmentStatus>())?;
    match target {
        AssignmentStatus::Accepted => Ok(Command::Accept),
        AssignmentStatus::Declined => Ok(Command::Decline {
            reason: request.reason.clone(),
        }),
        AssignmentStatus::Completed => Ok(Command::Complete {
            treatment_notes: request.treatment_notes.clone(),
        }),
        AssignmentStatus::Cancelled => Ok(Command::Cancel {
            cancelled_by: actor.cancelled_by(),
            reason: request.reason.clone(),
        }),
        AssignmentStatus::Pending => Err(ApiError::InvalidTransition {
            from: current.status.to_string(),
            to: target.to_string(),
            reason: String::from("assignments never return to pending"),
        }),
    }
}

// ============================================================================
// Slots
// ============================================================================

/// Creates a manual parent slot for a doctor.
///
/// # Errors
///
/// Returns an error if:
/// - The caller does not manage the doctor's schedule
/// - The date or times are malformed, or start is not before end
/// - The slot overlaps an open parent slot of the doctor on that date
pub fn create_slot(
    persistence: &mut SqlitePersistence,
    request: &CreateSlotRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: &Cause,
    now: OffsetDateTime,
) -> Result<SlotResponse, ApiError> {
    AuthorizationService::authorize_doctor_schedule(
        authenticated_actor,
        request.doctor_id,
        "create_slot",
    )?;

    let slot_date: NaiveDate = parsed(parse_date(&request.slot_date))?;
    let range: TimeRange = parsed(TimeRange::parse(&request.start_time, &request.end_time))?;
    let mut slot: AvailabilitySlot = AvailabilitySlot::new_manual(request.doctor_id, slot_date, range);
    slot.notes.clone_from(&request.notes);

    let created: AvailabilitySlot = persistence.create_slot(slot, now)?;
    info!(
        slot_id = created.id(),
        doctor_id = created.doctor_id,
        slot_date = %created.slot_date,
        range = %created.range,
        "Created slot"
    );

    let event: AuditEvent = mutation_event(
        authenticated_actor,
        cause,
        "CreateSlot",
        created.notes.clone(),
        EntityRef::new(EntityType::Slot, created.id()),
        StateSnapshot::empty(),
        slot_snapshot(&created),
    );
    record_audit(persistence, &event, now);

    SlotResponse::try_from(&created)
}

/// Retrieves a slot.
///
/// # Errors
///
/// Returns `NotFound` if the slot does not exist.
pub fn get_slot(
    persistence: &mut SqlitePersistence,
    slot_id: i64,
) -> Result<SlotResponse, ApiError> {
    let slot: AvailabilitySlot = persistence.get_slot(slot_id)?;
    SlotResponse::try_from(&slot)
}

/// Lists a doctor's slots on a date.
///
/// # Errors
///
/// Returns an error if the date is malformed or the query fails.
pub fn list_slots(
    persistence: &mut SqlitePersistence,
    doctor_id: i64,
    date: &str,
) -> Result<Vec<SlotResponse>, ApiError> {
    let slot_date: NaiveDate = parsed(parse_date(date))?;
    let slots: Vec<AvailabilitySlot> = persistence.list_slots(doctor_id, slot_date)?;
    debug!(doctor_id, slot_date = %slot_date, count = slots.len(), "Listed slots");
    slots.iter().map(SlotResponse::try_from).collect()
}

/// Lists the sub-slots carved out of a parent slot.
///
/// # Errors
///
/// Returns `NotFound` if the parent does not exist.
pub fn list_sub_slots(
    persistence: &mut SqlitePersistence,
    parent_slot_id: i64,
) -> Result<Vec<SubSlotResponse>, ApiError> {
    let linkage: Vec<SubSlotLinkage> = persistence.list_sub_slots(parent_slot_id)?;
    linkage.iter().map(SubSlotResponse::try_from).collect()
}

/// Reserves a booked sub-slot out of a parent slot for a hospital.
///
/// # Errors
///
/// Returns an error if:
/// - The caller may not book for the hospital
/// - The range is malformed or outside the parent
/// - The range overlaps a sibling sub-slot still held
/// - The parent is missing, not available, or itself a sub-slot
pub fn reserve_sub_slot(
    persistence: &mut SqlitePersistence,
    parent_slot_id: i64,
    request: &ReserveSubSlotRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: &Cause,
    now: OffsetDateTime,
) -> Result<SlotResponse, ApiError> {
    let hospital_id: i64 =
        resolve_hospital(authenticated_actor, request.hospital_id, "reserve_sub_slot")?;
    let range: TimeRange = parsed(TimeRange::parse(&request.start_time, &request.end_time))?;

    let sub_slot: AvailabilitySlot =
        persistence.reserve_sub_slot(parent_slot_id, hospital_id, range, now)?;
    info!(
        slot_id = sub_slot.id(),
        parent_slot_id,
        hospital_id,
        range = %sub_slot.range,
        "Reserved sub-slot"
    );

    let event: AuditEvent = mutation_event(
        authenticated_actor,
        cause,
        "ReserveSubSlot",
        Some(format!("Reserved {range} of slot {parent_slot_id}")),
        EntityRef::new(EntityType::Slot, sub_slot.id()),
        StateSnapshot::empty(),
        slot_snapshot(&sub_slot),
    );
    record_audit(persistence, &event, now);

    SlotResponse::try_from(&sub_slot)
}

/// Releases a booked slot back to `available`.
///
/// Releasing a slot that is not booked changes nothing.
///
/// # Errors
///
/// Returns an error if:
/// - The slot does not exist
/// - The caller neither owns the slot nor holds its booking
/// - An active assignment still holds the slot
pub fn release_slot(
    persistence: &mut SqlitePersistence,
    slot_id: i64,
    authenticated_actor: &AuthenticatedActor,
    cause: &Cause,
    now: OffsetDateTime,
) -> Result<SlotResponse, ApiError> {
    let before: AvailabilitySlot = persistence.get_slot(slot_id)?;
    AuthorizationService::authorize_release_slot(authenticated_actor, &before)?;

    let released: AvailabilitySlot = persistence.release_slot(slot_id, now)?;
    if released.status != before.status {
        info!(slot_id, "Released slot");
        let event: AuditEvent = mutation_event(
            authenticated_actor,
            cause,
            "ReleaseSlot",
            None,
            EntityRef::new(EntityType::Slot, slot_id),
            slot_snapshot(&before),
            slot_snapshot(&released),
        );
        record_audit(persistence, &event, now);
    }

    SlotResponse::try_from(&released)
}

// ============================================================================
// Templates and leaves
// ============================================================================

/// Creates a recurring availability template.
///
/// # Errors
///
/// Returns an error if the caller does not manage the doctor's schedule or
/// any field fails validation.
pub fn create_template(
    persistence: &mut SqlitePersistence,
    request: &CreateTemplateRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: &Cause,
    now: OffsetDateTime,
) -> Result<TemplateResponse, ApiError> {
    AuthorizationService::authorize_doctor_schedule(
        authenticated_actor,
        request.doctor_id,
        "create_template",
    )?;

    let pattern: RecurrencePattern = parsed(request.recurrence_pattern.parse())?;
    let days: Vec<Weekday> = parsed(
        request
            .recurrence_days
            .iter()
            .map(|tag| parse_weekday_tag(tag))
            .collect(),
    )?;
    let range: TimeRange = parsed(TimeRange::parse(&request.start_time, &request.end_time))?;
    let valid_from: NaiveDate = parsed(parse_date(&request.valid_from))?;
    let valid_until: Option<NaiveDate> = parse_optional_date(request.valid_until.as_deref())?;

    let template: AvailabilityTemplate = parsed(AvailabilityTemplate::new(
        request.doctor_id,
        &request.template_name,
        pattern,
        days,
        range,
        valid_from,
        valid_until,
    ))?;
    let created: AvailabilityTemplate = persistence.create_template(template, now)?;
    info!(
        template_id = created.id(),
        doctor_id = created.doctor_id,
        pattern = created.pattern.as_str(),
        "Created template"
    );

    let event: AuditEvent = mutation_event(
        authenticated_actor,
        cause,
        "CreateTemplate",
        None,
        EntityRef::new(EntityType::Template, created.id()),
        StateSnapshot::empty(),
        template_snapshot(&created),
    );
    record_audit(persistence, &event, now);

    Ok(TemplateResponse::from(&created))
}

/// Marks a template inactive. Slots it already generated stay.
///
/// # Errors
///
/// Returns `NotFound` if the template does not exist, or `Unauthorized`
/// if the caller does not manage its doctor's schedule.
pub fn deactivate_template(
    persistence: &mut SqlitePersistence,
    template_id: i64,
    authenticated_actor: &AuthenticatedActor,
    cause: &Cause,
    now: OffsetDateTime,
) -> Result<TemplateResponse, ApiError> {
    let before: AvailabilityTemplate = persistence.get_template(template_id)?;
    AuthorizationService::authorize_doctor_schedule(
        authenticated_actor,
        before.doctor_id,
        "deactivate_template",
    )?;

    let after: AvailabilityTemplate = persistence.deactivate_template(template_id)?;
    info!(template_id, "Deactivated template");

    let event: AuditEvent = mutation_event(
        authenticated_actor,
        cause,
        "DeactivateTemplate",
        None,
        EntityRef::new(EntityType::Template, template_id),
        template_snapshot(&before),
        template_snapshot(&after),
    );
    record_audit(persistence, &event, now);

    Ok(TemplateResponse::from(&after))
}

/// Expands active templates into concrete slots over a date window.
///
/// Admins may expand any templates. Doctors expand only their own; a
/// doctor's request is restricted to the doctor's ID.
///
/// # Errors
///
/// Returns an error if the caller is a hospital, a doctor names another
/// doctor, or the window is malformed. Per-template failures are reported
/// in the summary rather than returned.
pub fn expand_templates(
    persistence: &mut SqlitePersistence,
    config: &EngineConfig,
    request: &ExpandTemplatesRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: &Cause,
    now: OffsetDateTime,
) -> Result<ExpansionSummary, ApiError> {
    let doctor_ids: Vec<i64> = match authenticated_actor.role {
        Role::Admin => request.doctor_ids.clone(),
        Role::Doctor => {
            for doctor_id in &request.doctor_ids {
                AuthorizationService::authorize_doctor_schedule(
                    authenticated_actor,
                    *doctor_id,
                    "expand_templates",
                )?;
            }
            vec![authenticated_actor.id]
        }
        Role::Hospital => {
            AuthorizationService::authorize_admin(authenticated_actor, "expand_templates")?;
            Vec::new()
        }
    };

    let expansion: ExpansionRequest = ExpansionRequest {
        start_date: parse_optional_date(request.start_date.as_deref())?,
        end_date: parse_optional_date(request.end_date.as_deref())?,
        days: request.days,
        doctor_ids,
        template_ids: request.template_ids.clone(),
    };

    let summary: ExpansionSummary = persistence.expand_templates(config, &expansion, now)?;

    for report in summary.templates.iter().filter(|r| r.created > 0) {
        let event: AuditEvent = mutation_event(
            authenticated_actor,
            cause,
            "ExpandTemplate",
            Some(format!(
                "Created {} slots between {} and {}",
                report.created, summary.start_date, summary.end_date
            )),
            EntityRef::new(EntityType::Template, report.template_id),
            StateSnapshot::empty(),
            StateSnapshot::new(format!("slots_created={}", report.created)),
        );
        record_audit(persistence, &event, now);
    }

    Ok(summary)
}

/// Records a doctor leave. Template expansion skips the covered dates.
///
/// # Errors
///
/// Returns an error if the caller does not manage the doctor's schedule,
/// the leave type is unknown, or the end date is before the start date.
pub fn record_leave(
    persistence: &mut SqlitePersistence,
    request: &RecordLeaveRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: &Cause,
    now: OffsetDateTime,
) -> Result<LeaveResponse, ApiError> {
    AuthorizationService::authorize_doctor_schedule(
        authenticated_actor,
        request.doctor_id,
        "record_leave",
    )?;

    let leave_type: LeaveType = parsed(request.leave_type.parse())?;
    let start_date: NaiveDate = parsed(parse_date(&request.start_date))?;
    let end_date: NaiveDate = parsed(parse_date(&request.end_date))?;
    let leave: LeaveRecord = parsed(LeaveRecord::new(
        request.doctor_id,
        leave_type,
        start_date,
        end_date,
        request.reason.clone(),
    ))?;

    let stored: LeaveRecord = persistence.record_leave(leave, now)?;
    let leave_id: i64 = stored.leave_id.unwrap_or_default();
    info!(
        leave_id,
        doctor_id = stored.doctor_id,
        leave_type = stored.leave_type.as_str(),
        "Recorded leave"
    );

    let event: AuditEvent = mutation_event(
        authenticated_actor,
        cause,
        "RecordLeave",
        stored.reason.clone(),
        EntityRef::new(EntityType::Leave, leave_id),
        StateSnapshot::empty(),
        StateSnapshot::new(format!(
            "type={},from={},to={}",
            stored.leave_type.as_str(),
            format_date(stored.start_date),
            format_date(stored.end_date)
        )),
    );
    record_audit(persistence, &event, now);

    Ok(LeaveResponse::from(&stored))
}

// ============================================================================
// Assignments
// ============================================================================

/// Creates an assignment, reserving its slot and both parties' quota atomically.
///
/// # Errors
///
/// Returns an error if:
/// - The caller may not book for the hospital
/// - The slot selection is ambiguous or incomplete
/// - The slot is taken, belongs to another doctor, or the range is invalid
/// - Either party's monthly quota is exhausted
/// - The consultation fee is negative
pub fn create_assignment(
    persistence: &mut SqlitePersistence,
    config: &EngineConfig,
    notifier: &dyn Notifier,
    request: &CreateAssignmentRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: &Cause,
    now: OffsetDateTime,
) -> Result<CreateAssignmentResponse, ApiError> {
    let hospital_id: i64 =
        resolve_hospital(authenticated_actor, request.hospital_id, "create_assignment")?;

    let slot_request: SlotRequest = match (request.slot_id, request.parent_slot_id) {
        (Some(slot_id), None) => SlotRequest::Existing(slot_id),
        (None, Some(parent_slot_id)) => {
            let (Some(start), Some(end)) = (&request.start_time, &request.end_time) else {
                return Err(ApiError::InvalidInput {
                    field: String::from("start_time"),
                    message: String::from(
                        "start_time and end_time are required with parent_slot_id",
                    ),
                });
            };
            SlotRequest::SubSlot {
                parent_slot_id,
                range: parsed(TimeRange::parse(start, end))?,
            }
        }
        _ => {
            return Err(ApiError::InvalidInput {
                field: String::from("slot_id"),
                message: String::from("exactly one of slot_id or parent_slot_id is required"),
            });
        }
    };

    let priority: Priority = match &request.priority {
        Some(value) => parsed(value.parse())?,
        None => Priority::Routine,
    };

    let new_assignment: NewAssignment = NewAssignment {
        hospital_id,
        doctor_id: request.doctor_id,
        patient_id: request.patient_id,
        availability_slot_id: None,
        priority,
        consultation_fee_cents: request.consultation_fee_cents,
    };

    let actor: Actor = authenticated_actor.to_audit_actor();
    let created: CreatedAssignment = persistence.create_assignment(
        config,
        &new_assignment,
        slot_request,
        &actor,
        cause,
        now,
    )?;
    publish(persistence, notifier, &created.result, now);

    let assignment: &Assignment = &created.result.assignment;
    let response: AssignmentResponse = assignment_view(
        persistence,
        config,
        authenticated_actor,
        assignment,
        Some(&created.slot),
        now,
    )?;

    Ok(CreateAssignmentResponse {
        message: format!(
            "Assignment {} requested from doctor {}",
            assignment.id(),
            assignment.doctor_id
        ),
        assignment: response,
        slot: SlotResponse::try_from(&created.slot)?,
    })
}

/// Retrieves an assignment with the caller's capabilities.
///
/// # Errors
///
/// Returns `NotFound` if it does not exist, or `Unauthorized` if the
/// caller is not a participant.
pub fn get_assignment(
    persistence: &mut SqlitePersistence,
    config: &EngineConfig,
    assignment_id: i64,
    authenticated_actor: &AuthenticatedActor,
    now: OffsetDateTime,
) -> Result<AssignmentResponse, ApiError> {
    let assignment: Assignment = persistence.get_assignment(assignment_id)?;
    AuthorizationService::authorize_view_assignment(authenticated_actor, &assignment)?;
    assignment_view(persistence, config, authenticated_actor, &assignment, None, now)
}

/// Lists every assignment that has referenced a slot, oldest first.
///
/// # Errors
///
/// Returns `NotFound` if the slot does not exist, or `Unauthorized` unless
/// the caller owns the slot or is an admin.
pub fn list_assignments_for_slot(
    persistence: &mut SqlitePersistence,
    config: &EngineConfig,
    slot_id: i64,
    authenticated_actor: &AuthenticatedActor,
    now: OffsetDateTime,
) -> Result<Vec<AssignmentResponse>, ApiError> {
    let slot: AvailabilitySlot = persistence.get_slot(slot_id)?;
    AuthorizationService::authorize_doctor_schedule(
        authenticated_actor,
        slot.doctor_id,
        "list_assignments_for_slot",
    )?;

    let assignments: Vec<Assignment> = persistence.list_assignments_for_slot(slot_id)?;
    assignments
        .iter()
        .map(|a| assignment_view(persistence, config, authenticated_actor, a, Some(&slot), now))
        .collect()
}

/// Moves an assignment to a new status.
///
/// The requested status maps to a lifecycle command: `accepted`,
/// `declined`, `completed`, or `cancelled`. Cancellations are attributed
/// from the caller's role.
///
/// # Errors
///
/// Returns an error if:
/// - The assignment does not exist
/// - The caller may not perform this transition
/// - The assignment is already final, or the lifecycle forbids the move
/// - Acceptance comes at or after the response deadline
/// - A participant cancels inside the notice window
#[allow(clippy::too_many_arguments)]
pub fn transition_assignment(
    persistence: &mut SqlitePersistence,
    config: &EngineConfig,
    notifier: &dyn Notifier,
    assignment_id: i64,
    request: &TransitionAssignmentRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: &Cause,
    now: OffsetDateTime,
) -> Result<TransitionAssignmentResponse, ApiError> {
    let current: Assignment = persistence.get_assignment(assignment_id)?;
    let command: Command = command_for(authenticated_actor, &current, request)?;
    AuthorizationService::authorize_transition(authenticated_actor, &current, &command)?;

    let actor: Actor = authenticated_actor.to_audit_actor();
    let result: TransitionResult =
        persistence.transition_assignment(config, assignment_id, &command, &actor, cause, now)?;
    publish(persistence, notifier, &result, now);

    let previous_status: String = result
        .previous_status
        .unwrap_or(current.status)
        .to_string();
    let response: AssignmentResponse = assignment_view(
        persistence,
        config,
        authenticated_actor,
        &result.assignment,
        None,
        now,
    )?;

    Ok(TransitionAssignmentResponse {
        message: format!(
            "Assignment {assignment_id} moved from {previous_status} to {}",
            result.assignment.status
        ),
        assignment: response,
        previous_status,
        slot_released: result.slot_effect == SlotEffect::Release,
    })
}

/// Cancels every pending assignment whose response window has elapsed.
///
/// Used by the scheduled sweep, which runs as the system.
///
/// # Errors
///
/// Returns an error if storage fails; the sweep then commits nothing.
pub fn sweep_expired_assignments(
    persistence: &mut SqlitePersistence,
    config: &EngineConfig,
    notifier: &dyn Notifier,
    now: OffsetDateTime,
) -> Result<SweepResponse, ApiError> {
    let (summary, results) = persistence.run_expiry_sweep(config, now)?;
    for result in &results {
        publish(persistence, notifier, result, now);
    }

    Ok(SweepResponse {
        found: summary.found,
        cancelled: summary.cancelled,
        released: summary.released,
        cancelled_assignment_ids: results.iter().map(|r| r.assignment.id()).collect(),
    })
}

/// Runs the expiry sweep on an admin's request.
///
/// # Errors
///
/// Returns `Unauthorized` for non-admins, or an error if storage fails.
pub fn run_expiry_sweep(
    persistence: &mut SqlitePersistence,
    config: &EngineConfig,
    notifier: &dyn Notifier,
    authenticated_actor: &AuthenticatedActor,
    now: OffsetDateTime,
) -> Result<SweepResponse, ApiError> {
    AuthorizationService::authorize_admin(authenticated_actor, "run_expiry_sweep")?;
    sweep_expired_assignments(persistence, config, notifier, now)
}

// ============================================================================
// Usage and subscriptions
// ============================================================================

/// Reports an actor's usage for a month (the current month by default).
///
/// # Errors
///
/// Returns an error if the kind or month is malformed, or the caller is
/// neither that actor nor an admin.
pub fn get_usage(
    persistence: &mut SqlitePersistence,
    config: &EngineConfig,
    actor_kind: &str,
    actor_id: i64,
    month: Option<&str>,
    authenticated_actor: &AuthenticatedActor,
    now: OffsetDateTime,
) -> Result<UsageStatus, ApiError> {
    let kind: ActorKind = parsed(actor_kind.parse())?;
    AuthorizationService::authorize_view_usage(authenticated_actor, kind, actor_id)?;
    let month: MonthKey = parse_month(month, config, now)?;
    Ok(persistence.usage_status(config, kind, actor_id, month)?)
}

/// Prepares a month's usage records for every known actor.
///
/// # Errors
///
/// Returns `Unauthorized` for non-admins, or an error if the month is
/// malformed or storage fails.
pub fn reset_monthly_usage(
    persistence: &mut SqlitePersistence,
    config: &EngineConfig,
    request: &ResetUsageRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: &Cause,
    now: OffsetDateTime,
) -> Result<MonthlyResetSummary, ApiError> {
    AuthorizationService::authorize_admin(authenticated_actor, "reset_monthly_usage")?;
    let month: MonthKey = parse_month(request.month.as_deref(), config, now)?;

    let summary: MonthlyResetSummary = persistence.reset_monthly_usage(config, month, now)?;

    let event: AuditEvent = mutation_event(
        authenticated_actor,
        cause,
        "ResetMonthlyUsage",
        Some(format!("Prepared usage for {}", summary.month)),
        EntityRef::new(EntityType::Usage, 0),
        StateSnapshot::empty(),
        StateSnapshot::new(format!(
            "month={},actors_reset={},records_created={}",
            summary.month, summary.actors_reset, summary.records_created
        )),
    );
    record_audit(persistence, &event, now);

    Ok(summary)
}

/// Records an actor's plan subscription.
///
/// # Errors
///
/// Returns `Unauthorized` for non-admins, or an error if a tag is unknown
/// or the write fails.
pub fn set_subscription(
    persistence: &mut SqlitePersistence,
    config: &EngineConfig,
    request: &SetSubscriptionRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: &Cause,
    now: OffsetDateTime,
) -> Result<SubscriptionResponse, ApiError> {
    AuthorizationService::authorize_admin(authenticated_actor, "set_subscription")?;

    let subscription: PlanSubscription = PlanSubscription {
        actor_id: request.subscriber_id,
        actor_kind: parsed(request.subscriber_kind.parse::<ActorKind>())?,
        tier: parsed(request.tier.parse::<PlanTier>())?,
        status: parsed(request.status.parse::<SubscriptionStatus>())?,
        max_assignments_per_month: request.max_assignments_per_month,
    };

    let effective_limit: i32 = persistence.set_subscription(config, &subscription, now)?;
    info!(
        actor_id = subscription.actor_id,
        actor_kind = %subscription.actor_kind,
        tier = subscription.tier.as_str(),
        effective_limit,
        "Recorded subscription"
    );

    let event: AuditEvent = mutation_event(
        authenticated_actor,
        cause,
        "SetSubscription",
        None,
        EntityRef::new(EntityType::Subscription, subscription.actor_id),
        StateSnapshot::empty(),
        StateSnapshot::new(format!(
            "kind={},tier={},status={},limit={effective_limit}",
            subscription.actor_kind,
            subscription.tier.as_str(),
            subscription.status.as_str()
        )),
    );
    record_audit(persistence, &event, now);

    Ok(SubscriptionResponse {
        subscriber_id: subscription.actor_id,
        subscriber_kind: subscription.actor_kind.to_string(),
        tier: subscription.tier.as_str().to_string(),
        status: subscription.status.as_str().to_string(),
        effective_limit,
        message: format!(
            "Subscription recorded for {} {}",
            subscription.actor_kind, subscription.actor_id
        ),
    })
}

// ============================================================================
// Audit
// ============================================================================

/// Lists the audit trail of one entity, oldest first.
///
/// # Errors
///
/// Returns `Unauthorized` for non-admins, or `InvalidInput` for an unknown
/// entity type.
pub fn list_audit_events(
    persistence: &mut SqlitePersistence,
    entity_type: &str,
    entity_id: i64,
    authenticated_actor: &AuthenticatedActor,
) -> Result<Vec<AuditEventResponse>, ApiError> {
    AuthorizationService::authorize_admin(authenticated_actor, "list_audit_events")?;
    let entity_type: EntityType =
        entity_type
            .parse()
            .map_err(|message: String| ApiError::InvalidInput {
                field: String::from("entity_type"),
                message,
            })?;

    let events: Vec<AuditEvent> = persistence.list_audit_events(entity_type, entity_id)?;
    Ok(events.into_iter().map(AuditEventResponse::from).collect())
}
