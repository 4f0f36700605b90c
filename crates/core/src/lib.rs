// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]

mod apply;
mod command;
mod config;
mod error;
mod event;
mod expansion;
mod state;
mod usage;

#[cfg(test)]
mod tests;

use consult_sched_domain::{AvailabilitySlot, DomainError, SlotStatus, TimeRange};
use time::OffsetDateTime;

// Re-export public types and functions
pub use apply::{apply, apply_create};
pub use command::{Command, EXPIRY_REASON, NewAssignment};
pub use config::{EngineConfig, TierLimits};
pub use error::CoreError;
pub use event::{AssignmentNotice, DomainEvent};
pub use expansion::{
    DEFAULT_EXPANSION_DAYS, ExpansionRequest, ExpansionSummary, ExpansionWindow,
    TemplateExpansionReport, TemplatePlan, generated_slot_note, plan_template,
};
pub use state::{SlotEffect, TransitionContext, TransitionResult, assignment_snapshot};
pub use usage::{MonthlyResetSummary, SweepSummary, UsageStatus};

/// Builds the booked sub-slot a hospital reserves out of a parent.
///
/// Validation against the parent and its siblings happens first; see
/// [`consult_sched_domain::validate_sub_slot_request`].
///
/// # Arguments
///
/// * `parent` - The available parent slot
/// * `hospital_id` - The hospital taking the booking
/// * `range` - The requested sub-range
/// * `now` - The booking instant
#[must_use]
pub const fn book_sub_slot(
    parent: &AvailabilitySlot,
    hospital_id: i64,
    range: TimeRange,
    now: OffsetDateTime,
) -> AvailabilitySlot {
    AvailabilitySlot {
        slot_id: None,
        doctor_id: parent.doctor_id,
        template_id: None,
        parent_slot_id: parent.slot_id,
        slot_date: parent.slot_date,
        range,
        status: SlotStatus::Booked,
        is_manual: false,
        booked_by_hospital_id: Some(hospital_id),
        booked_at: Some(now),
        notes: None,
    }
}

/// Returns the instant a slot starts in the operational timezone.
///
/// # Errors
///
/// Returns an error if the wall-clock time cannot be resolved.
pub fn slot_start_instant(
    config: &EngineConfig,
    slot: &AvailabilitySlot,
) -> Result<OffsetDateTime, DomainError> {
    consult_sched_domain::local_instant(slot.slot_date, slot.range.start(), config.timezone)
}
