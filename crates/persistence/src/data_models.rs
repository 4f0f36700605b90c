// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Row shapes read from the database and their conversion into domain types.
//!
//! Stored enum and time columns are text. A value the domain rejects on the
//! way back in means the row was written outside this crate, so conversion
//! failures surface as `SerializationError` rather than as domain errors.

use consult_sched_audit::{
    Action, Actor, AuditEvent, Cause, EntityRef, EntityType, StateSnapshot,
};
use consult_sched_domain::{
    ActorKind, Assignment, AssignmentStatus, AvailabilitySlot, AvailabilityTemplate, CancelledBy,
    DomainError, LeaveRecord, LeaveType, MonthKey, PlanSubscription, PlanTier, Priority,
    RecurrencePattern, SlotStatus, SubscriptionStatus, TimeRange, UsageRecord, parse_date,
    parse_instant, parse_recurrence_days,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::diesel_schema::{
    assignment_payments, assignments, audit_events, availability_slots, availability_templates,
    doctor_leaves, plan_subscriptions, usage_records,
};
use crate::error::PersistenceError;

/// Serializable representation of an Actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorData {
    pub id: String,
    pub actor_type: String,
}

/// Serializable representation of a Cause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CauseData {
    pub id: String,
    pub description: String,
}

/// Serializable representation of an Action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionData {
    pub name: String,
    pub details: Option<String>,
}

/// Serializable representation of a `StateSnapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshotData {
    pub data: String,
}

/// A payment settlement row created when a paid consultation completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Queryable, Selectable)]
#[diesel(table_name = assignment_payments)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub payment_id: i64,
    pub assignment_id: i64,
    pub consultation_fee_cents: i64,
    pub platform_commission_cents: i64,
    pub doctor_payout_cents: i64,
    pub payment_status: String,
    pub created_at: String,
}

/// A sub-slot together with the most recent assignment that references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubSlotLinkage {
    pub slot: AvailabilitySlot,
    pub assignment_id: Option<i64>,
    pub assignment_status: Option<AssignmentStatus>,
}

fn stored<T>(result: Result<T, DomainError>) -> Result<T, PersistenceError> {
    result.map_err(|e| PersistenceError::SerializationError(format!("stored value rejected: {e}")))
}

fn stored_instant(value: Option<&str>) -> Result<Option<OffsetDateTime>, PersistenceError> {
    stored(value.map(parse_instant).transpose())
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = availability_slots)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct SlotRow {
    pub slot_id: i64,
    pub doctor_id: i64,
    pub template_id: Option<i64>,
    pub parent_slot_id: Option<i64>,
    pub slot_date: String,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
    pub is_manual: bool,
    pub booked_by_hospital_id: Option<i64>,
    pub booked_at: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<SlotRow> for AvailabilitySlot {
    type Error = PersistenceError;

    fn try_from(row: SlotRow) -> Result<Self, Self::Error> {
        Ok(Self {
            slot_id: Some(row.slot_id),
            doctor_id: row.doctor_id,
            template_id: row.template_id,
            parent_slot_id: row.parent_slot_id,
            slot_date: stored(parse_date(&row.slot_date))?,
            range: stored(TimeRange::parse(&row.start_time, &row.end_time))?,
            status: stored(row.status.parse::<SlotStatus>())?,
            is_manual: row.is_manual,
            booked_by_hospital_id: row.booked_by_hospital_id,
            booked_at: stored_instant(row.booked_at.as_deref())?,
            notes: row.notes,
        })
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = availability_templates)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct TemplateRow {
    pub template_id: i64,
    pub doctor_id: i64,
    pub template_name: String,
    pub recurrence_pattern: String,
    pub recurrence_days: String,
    pub start_time: String,
    pub end_time: String,
    pub valid_from: String,
    pub valid_until: Option<String>,
    pub is_active: bool,
}

impl TryFrom<TemplateRow> for AvailabilityTemplate {
    type Error = PersistenceError;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        Ok(Self {
            template_id: Some(row.template_id),
            doctor_id: row.doctor_id,
            name: row.template_name,
            pattern: stored(row.recurrence_pattern.parse::<RecurrencePattern>())?,
            days: stored(parse_recurrence_days(&row.recurrence_days))?,
            range: stored(TimeRange::parse(&row.start_time, &row.end_time))?,
            valid_from: stored(parse_date(&row.valid_from))?,
            valid_until: stored(row.valid_until.as_deref().map(parse_date).transpose())?,
            is_active: row.is_active,
        })
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = assignments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct AssignmentRow {
    pub assignment_id: i64,
    pub hospital_id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    pub availability_slot_id: Option<i64>,
    pub status: String,
    pub priority: String,
    pub requested_at: String,
    pub expires_at: Option<String>,
    pub actual_start_time: Option<String>,
    pub actual_end_time: Option<String>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub cancelled_by: Option<String>,
    pub cancellation_reason: Option<String>,
    pub treatment_notes: Option<String>,
    pub consultation_fee_cents: Option<i64>,
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = PersistenceError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            assignment_id: Some(row.assignment_id),
            hospital_id: row.hospital_id,
            doctor_id: row.doctor_id,
            patient_id: row.patient_id,
            availability_slot_id: row.availability_slot_id,
            status: stored(row.status.parse::<AssignmentStatus>())?,
            priority: stored(row.priority.parse::<Priority>())?,
            requested_at: stored(parse_instant(&row.requested_at))?,
            expires_at: stored_instant(row.expires_at.as_deref())?,
            actual_start_time: stored_instant(row.actual_start_time.as_deref())?,
            actual_end_time: stored_instant(row.actual_end_time.as_deref())?,
            completed_at: stored_instant(row.completed_at.as_deref())?,
            cancelled_at: stored_instant(row.cancelled_at.as_deref())?,
            cancelled_by: stored(
                row.cancelled_by
                    .as_deref()
                    .map(str::parse::<CancelledBy>)
                    .transpose(),
            )?,
            cancellation_reason: row.cancellation_reason,
            treatment_notes: row.treatment_notes,
            consultation_fee_cents: row.consultation_fee_cents,
        })
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = doctor_leaves)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct LeaveRow {
    pub leave_id: i64,
    pub doctor_id: i64,
    pub leave_type: String,
    pub start_date: String,
    pub end_date: String,
    pub reason: Option<String>,
}

impl TryFrom<LeaveRow> for LeaveRecord {
    type Error = PersistenceError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        Ok(Self {
            leave_id: Some(row.leave_id),
            doctor_id: row.doctor_id,
            leave_type: stored(row.leave_type.parse::<LeaveType>())?,
            start_date: stored(parse_date(&row.start_date))?,
            end_date: stored(parse_date(&row.end_date))?,
            reason: row.reason,
        })
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = plan_subscriptions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct SubscriptionRow {
    pub actor_id: i64,
    pub actor_kind: String,
    pub tier: String,
    pub status: String,
    pub max_assignments_per_month: Option<i32>,
}

impl TryFrom<SubscriptionRow> for PlanSubscription {
    type Error = PersistenceError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            actor_id: row.actor_id,
            actor_kind: stored(row.actor_kind.parse::<ActorKind>())?,
            tier: stored(row.tier.parse::<PlanTier>())?,
            status: stored(row.status.parse::<SubscriptionStatus>())?,
            max_assignments_per_month: row.max_assignments_per_month,
        })
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = usage_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct UsageRow {
    pub actor_id: i64,
    pub actor_kind: String,
    pub month: String,
    pub count: i32,
    pub limit_count: i32,
}

impl TryFrom<UsageRow> for UsageRecord {
    type Error = PersistenceError;

    fn try_from(row: UsageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            actor_id: row.actor_id,
            actor_kind: stored(row.actor_kind.parse::<ActorKind>())?,
            month: stored(row.month.parse::<MonthKey>())?,
            count: row.count,
            limit: row.limit_count,
        })
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = audit_events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct AuditEventRow {
    pub event_id: i64,
    pub entity_type: String,
    pub entity_id: i64,
    pub actor_json: String,
    pub cause_json: String,
    pub action_json: String,
    pub before_snapshot_json: String,
    pub after_snapshot_json: String,
    pub created_at: String,
}

impl TryFrom<AuditEventRow> for AuditEvent {
    type Error = PersistenceError;

    fn try_from(row: AuditEventRow) -> Result<Self, Self::Error> {
        let actor_data: ActorData = serde_json::from_str(&row.actor_json)?;
        let cause_data: CauseData = serde_json::from_str(&row.cause_json)?;
        let action_data: ActionData = serde_json::from_str(&row.action_json)?;
        let before_data: StateSnapshotData = serde_json::from_str(&row.before_snapshot_json)?;
        let after_data: StateSnapshotData = serde_json::from_str(&row.after_snapshot_json)?;
        let entity_type: EntityType = row
            .entity_type
            .parse()
            .map_err(PersistenceError::SerializationError)?;

        let mut event: Self = Self::new(
            Actor::new(actor_data.id, actor_data.actor_type),
            Cause::new(cause_data.id, cause_data.description),
            Action::new(action_data.name, action_data.details),
            EntityRef::new(entity_type, row.entity_id),
            StateSnapshot::new(before_data.data),
            StateSnapshot::new(after_data.data),
        );
        event.event_id = Some(row.event_id);
        event.recorded_at = Some(row.created_at);
        Ok(event)
    }
}
