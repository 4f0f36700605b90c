// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::config::EngineConfig;
use crate::event::DomainEvent;
use consult_sched_audit::{AuditEvent, StateSnapshot};
use consult_sched_domain::{Assignment, AssignmentStatus};
use time::OffsetDateTime;

/// Inputs a transition is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext<'a> {
    pub config: &'a EngineConfig,
    /// The instant the transition happens.
    pub now: OffsetDateTime,
    /// Start of the linked slot, used for the cancellation notice check.
    pub slot_start: Option<OffsetDateTime>,
}

impl<'a> TransitionContext<'a> {
    #[must_use]
    pub const fn new(config: &'a EngineConfig, now: OffsetDateTime) -> Self {
        Self {
            config,
            now,
            slot_start: None,
        }
    }

    #[must_use]
    pub const fn with_slot_start(mut self, slot_start: Option<OffsetDateTime>) -> Self {
        self.slot_start = slot_start;
        self
    }
}

/// What a transition does to the assignment's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotEffect {
    /// The slot stays booked.
    Hold,
    /// The slot returns to `available`.
    Release,
}

/// The result of a successful assignment transition.
///
/// Transitions are atomic: the persistence layer commits the new assignment
/// and the slot effect together, conditioned on `previous_status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    /// The assignment after the transition.
    pub assignment: Assignment,
    /// The status the stored row must still have; `None` for creation.
    pub previous_status: Option<AssignmentStatus>,
    /// What happens to the linked slot.
    pub slot_effect: SlotEffect,
    /// The audit event recording this transition.
    pub audit_event: AuditEvent,
    /// The event handed to the notifier after commit.
    pub domain_event: DomainEvent,
}

impl TransitionResult {
    /// Fills in the assignment ID once the row has been inserted.
    #[must_use]
    pub fn with_assignment_id(mut self, assignment_id: i64) -> Self {
        self.assignment.assignment_id = Some(assignment_id);
        self.audit_event = self.audit_event.with_entity_id(assignment_id);
        self.domain_event.set_assignment_id(assignment_id);
        self
    }
}

/// Converts an assignment to a snapshot for audit purposes.
#[must_use]
pub fn assignment_snapshot(assignment: &Assignment) -> StateSnapshot {
    StateSnapshot::new(format!(
        "status={},slot={},hospital={},doctor={}",
        assignment.status,
        assignment
            .availability_slot_id
            .map_or_else(|| String::from("none"), |id| id.to_string()),
        assignment.hospital_id,
        assignment.doctor_id,
    ))
}
