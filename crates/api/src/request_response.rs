// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API request and response data transfer objects.
//!
//! Requests carry dates, times, and enum tags as strings; handlers parse
//! them so malformed input is rejected before any write. Responses are
//! camelCase JSON.

use consult_sched_audit::AuditEvent;
use consult_sched_domain::{
    Assignment, AvailabilitySlot, AvailabilityTemplate, LeaveRecord, format_date, format_instant,
    format_time, weekday_tag,
};
use consult_sched_persistence::{PaymentRecord, SubSlotLinkage};
use time::OffsetDateTime;

use crate::error::{ApiError, translate_domain_error};

fn instant_text(value: Option<OffsetDateTime>) -> Result<Option<String>, ApiError> {
    value
        .map(format_instant)
        .transpose()
        .map_err(translate_domain_error)
}

// ============================================================================
// Requests
// ============================================================================

/// API request to create a manual parent slot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct CreateSlotRequest {
    pub doctor_id: i64,
    /// `YYYY-MM-DD`.
    pub slot_date: String,
    /// `HH:MM` or `HH:MM:SS`.
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// API request to reserve a booked sub-slot out of a parent slot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ReserveSubSlotRequest {
    /// Required for admins; hospitals reserve for themselves.
    #[serde(default)]
    pub hospital_id: Option<i64>,
    pub start_time: String,
    pub end_time: String,
}

/// API request to create a recurring availability template.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct CreateTemplateRequest {
    pub doctor_id: i64,
    pub template_name: String,
    /// `daily`, `weekly`, `monthly`, or `custom`.
    pub recurrence_pattern: String,
    /// Weekday tags, `sun` through `sat`.
    #[serde(default)]
    pub recurrence_days: Vec<String>,
    pub start_time: String,
    pub end_time: String,
    pub valid_from: String,
    #[serde(default)]
    pub valid_until: Option<String>,
}

/// API request to expand templates into concrete slots.
///
/// Every field is optional; the default is seven days from today for
/// every active template.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct ExpandTemplatesRequest {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub doctor_ids: Vec<i64>,
    #[serde(default)]
    pub template_ids: Vec<i64>,
}

/// API request to record a doctor leave.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct RecordLeaveRequest {
    pub doctor_id: i64,
    /// `sick`, `vacation`, `personal`, `emergency`, or `other`.
    pub leave_type: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// API request to create an assignment.
///
/// Exactly one of `slot_id` or `parent_slot_id` must be given. With
/// `parent_slot_id`, `start_time` and `end_time` name the sub-range to carve.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct CreateAssignmentRequest {
    /// Required for admins; hospitals book for themselves.
    #[serde(default)]
    pub hospital_id: Option<i64>,
    pub doctor_id: i64,
    pub patient_id: i64,
    #[serde(default)]
    pub slot_id: Option<i64>,
    #[serde(default)]
    pub parent_slot_id: Option<i64>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    /// `routine` (default), `urgent`, or `emergency`.
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub consultation_fee_cents: Option<i64>,
}

/// API request to move an assignment to a new status.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct TransitionAssignmentRequest {
    /// `accepted`, `declined`, `completed`, or `cancelled`.
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub treatment_notes: Option<String>,
}

/// API request to prepare a month's usage records.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct ResetUsageRequest {
    /// `YYYY-MM`; defaults to the current month.
    #[serde(default)]
    pub month: Option<String>,
}

/// API request to record an actor's plan subscription.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct SetSubscriptionRequest {
    pub subscriber_id: i64,
    /// `doctor` or `hospital`.
    pub subscriber_kind: String,
    /// `free`, `basic`, `premium`, or `enterprise`.
    pub tier: String,
    /// `active`, `cancelled`, or `expired`.
    pub status: String,
    /// Explicit feature limit; `-1` means unlimited.
    #[serde(default)]
    pub max_assignments_per_month: Option<i32>,
}

// ============================================================================
// Capabilities
// ============================================================================

/// Represents whether a specific action is permitted.
///
/// Serializes to JSON as true/false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// The action is permitted.
    Allowed,
    /// The action is not permitted.
    Denied,
}

impl Capability {
    /// Returns true if the capability is allowed.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Creates a capability from a boolean value.
    #[must_use]
    pub const fn from_bool(value: bool) -> Self {
        if value { Self::Allowed } else { Self::Denied }
    }
}

impl serde::Serialize for Capability {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bool(self.is_allowed())
    }
}

/// What the caller could do next with an assignment.
///
/// Advisory only; every transition is authorized again when attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentCapabilities {
    pub can_accept: Capability,
    pub can_decline: Capability,
    pub can_complete: Capability,
    pub can_cancel: Capability,
}

// ============================================================================
// Responses
// ============================================================================

/// A slot as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotResponse {
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

impl TryFrom<&AvailabilitySlot> for SlotResponse {
    type Error = ApiError;

    fn try_from(slot: &AvailabilitySlot) -> Result<Self, Self::Error> {
        Ok(Self {
            slot_id: slot.id(),
            doctor_id: slot.doctor_id,
            template_id: slot.template_id,
            parent_slot_id: slot.parent_slot_id,
            slot_date: format_date(slot.slot_date),
            start_time: format_time(slot.range.start()),
            end_time: format_time(slot.range.end()),
            status: slot.status.to_string(),
            is_manual: slot.is_manual,
            booked_by_hospital_id: slot.booked_by_hospital_id,
            booked_at: instant_text(slot.booked_at)?,
            notes: slot.notes.clone(),
        })
    }
}

/// A sub-slot with the assignment that most recently referenced it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubSlotResponse {
    #[serde(flatten)]
    pub slot: SlotResponse,
    pub assignment_id: Option<i64>,
    pub assignment_status: Option<String>,
}

impl TryFrom<&SubSlotLinkage> for SubSlotResponse {
    type Error = ApiError;

    fn try_from(linkage: &SubSlotLinkage) -> Result<Self, Self::Error> {
        Ok(Self {
            slot: SlotResponse::try_from(&linkage.slot)?,
            assignment_id: linkage.assignment_id,
            assignment_status: linkage.assignment_status.map(|s| s.as_str().to_string()),
        })
    }
}

/// A template as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateResponse {
    pub template_id: i64,
    pub doctor_id: i64,
    pub template_name: String,
    pub recurrence_pattern: String,
    pub recurrence_days: Vec<String>,
    pub start_time: String,
    pub end_time: String,
    pub valid_from: String,
    pub valid_until: Option<String>,
    pub is_active: bool,
}

impl From<&AvailabilityTemplate> for TemplateResponse {
    fn from(template: &AvailabilityTemplate) -> Self {
        Self {
            template_id: template.id(),
            doctor_id: template.doctor_id,
            template_name: template.name.clone(),
            recurrence_pattern: template.pattern.as_str().to_string(),
            recurrence_days: template
                .days
                .iter()
                .map(|d| weekday_tag(*d).to_string())
                .collect(),
            start_time: format_time(template.range.start()),
            end_time: format_time(template.range.end()),
            valid_from: format_date(template.valid_from),
            valid_until: template.valid_until.map(format_date),
            is_active: template.is_active,
        }
    }
}

/// A leave record as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    pub leave_id: i64,
    pub doctor_id: i64,
    pub leave_type: String,
    pub start_date: String,
    pub end_date: String,
    pub reason: Option<String>,
}

impl From<&LeaveRecord> for LeaveResponse {
    fn from(leave: &LeaveRecord) -> Self {
        Self {
            leave_id: leave.leave_id.unwrap_or_default(),
            doctor_id: leave.doctor_id,
            leave_type: leave.leave_type.as_str().to_string(),
            start_date: format_date(leave.start_date),
            end_date: format_date(leave.end_date),
            reason: leave.reason.clone(),
        }
    }
}

/// An assignment as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentRecord>,
    pub capabilities: AssignmentCapabilities,
}

impl AssignmentResponse {
    /// Builds a response from an assignment, its payment, and the caller's capabilities.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if a stored instant cannot be formatted.
    pub fn build(
        assignment: &Assignment,
        payment: Option<PaymentRecord>,
        capabilities: AssignmentCapabilities,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            assignment_id: assignment.id(),
            hospital_id: assignment.hospital_id,
            doctor_id: assignment.doctor_id,
            patient_id: assignment.patient_id,
            availability_slot_id: assignment.availability_slot_id,
            status: assignment.status.to_string(),
            priority: assignment.priority.to_string(),
            requested_at: format_instant(assignment.requested_at)
                .map_err(translate_domain_error)?,
            expires_at: instant_text(assignment.expires_at)?,
            actual_start_time: instant_text(assignment.actual_start_time)?,
            actual_end_time: instant_text(assignment.actual_end_time)?,
            completed_at: instant_text(assignment.completed_at)?,
            cancelled_at: instant_text(assignment.cancelled_at)?,
            cancelled_by: assignment.cancelled_by.map(|c| c.as_str().to_string()),
            cancellation_reason: assignment.cancellation_reason.clone(),
            treatment_notes: assignment.treatment_notes.clone(),
            consultation_fee_cents: assignment.consultation_fee_cents,
            payment,
            capabilities,
        })
    }
}

/// API response for a successful assignment creation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentResponse {
    pub assignment: AssignmentResponse,
    /// The slot the new assignment holds.
    pub slot: SlotResponse,
    pub message: String,
}

/// API response for a successful status transition.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionAssignmentResponse {
    pub assignment: AssignmentResponse,
    pub previous_status: String,
    /// True when the transition returned the slot to `available`.
    pub slot_released: bool,
    pub message: String,
}

/// API response for an expiry sweep run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub found: u32,
    pub cancelled: u32,
    pub released: u32,
    pub cancelled_assignment_ids: Vec<i64>,
}

/// API response for a recorded subscription.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub subscriber_id: i64,
    pub subscriber_kind: String,
    pub tier: String,
    pub status: String,
    /// The monthly limit the subscription resolves to; `-1` means unlimited.
    pub effective_limit: i32,
    pub message: String,
}

/// One audit trail entry as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEventResponse {
    pub event_id: Option<i64>,
    pub entity_type: String,
    pub entity_id: i64,
    pub actor_id: String,
    pub actor_type: String,
    pub cause_id: String,
    pub cause_description: String,
    pub action: String,
    pub details: Option<String>,
    pub before: String,
    pub after: String,
    pub recorded_at: Option<String>,
}

impl From<AuditEvent> for AuditEventResponse {
    fn from(event: AuditEvent) -> Self {
        Self {
            event_id: event.event_id,
            entity_type: event.entity.entity_type.as_str().to_string(),
            entity_id: event.entity.entity_id,
            actor_id: event.actor.id,
            actor_type: event.actor.actor_type,
            cause_id: event.cause.id,
            cause_description: event.cause.description,
            action: event.action.name,
            details: event.action.details,
            before: event.before.data,
            after: event.after.data,
            recorded_at: event.recorded_at,
        }
    }
}
