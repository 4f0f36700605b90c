// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Domain events emitted by committed assignment transitions.

use consult_sched_domain::{Assignment, AssignmentStatus, Priority};
use time::OffsetDateTime;

/// The facts a notification needs about an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentNotice {
    pub assignment_id: i64,
    pub hospital_id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    pub priority: Priority,
    pub status: AssignmentStatus,
    pub occurred_at: OffsetDateTime,
    pub reason: Option<String>,
}

impl AssignmentNotice {
    #[must_use]
    pub fn from_assignment(assignment: &Assignment, occurred_at: OffsetDateTime) -> Self {
        Self {
            assignment_id: assignment.id(),
            hospital_id: assignment.hospital_id,
            doctor_id: assignment.doctor_id,
            patient_id: assignment.patient_id,
            priority: assignment.priority,
            status: assignment.status,
            occurred_at,
            reason: assignment.cancellation_reason.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    AssignmentCreated(AssignmentNotice),
    AssignmentAccepted(AssignmentNotice),
    AssignmentDeclined(AssignmentNotice),
    AssignmentCancelled(AssignmentNotice),
    AssignmentExpired(AssignmentNotice),
    AssignmentCompleted(AssignmentNotice),
}

impl DomainEvent {
    /// Returns the event name used by notification collaborators.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AssignmentCreated(_) => "assignment_created",
            Self::AssignmentAccepted(_) => "assignment_accepted",
            Self::AssignmentDeclined(_) => "assignment_declined",
            Self::AssignmentCancelled(_) => "assignment_cancelled",
            Self::AssignmentExpired(_) => "assignment_expired",
            Self::AssignmentCompleted(_) => "assignment_completed",
        }
    }

    #[must_use]
    pub const fn notice(&self) -> &AssignmentNotice {
        match self {
            Self::AssignmentCreated(n)
            | Self::AssignmentAccepted(n)
            | Self::AssignmentDeclined(n)
            | Self::AssignmentCancelled(n)
            | Self::AssignmentExpired(n)
            | Self::AssignmentCompleted(n) => n,
        }
    }

    const fn notice_mut(&mut self) -> &mut AssignmentNotice {
        match self {
            Self::AssignmentCreated(n)
            | Self::AssignmentAccepted(n)
            | Self::AssignmentDeclined(n)
            | Self::AssignmentCancelled(n)
            | Self::AssignmentExpired(n)
            | Self::AssignmentCompleted(n) => n,
        }
    }

    pub(crate) const fn set_assignment_id(&mut self, assignment_id: i64) {
        self.notice_mut().assignment_id = assignment_id;
    }
}
