// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use consult_sched_domain::{AssignmentStatus, CancelledBy, Priority};

/// Reason recorded when the sweep cancels an unanswered request.
pub const EXPIRY_REASON: &str = "expired \u{2014} doctor did not respond in time";

/// A command represents user or system intent as data only.
///
/// Commands are the only way to request an assignment transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Doctor accepts a pending request.
    Accept,
    /// Doctor declines a pending request.
    Decline {
        /// Optional reason shown to the hospital.
        reason: Option<String>,
    },
    /// A participant marks an accepted assignment as finished.
    Complete {
        /// Optional treatment notes.
        treatment_notes: Option<String>,
    },
    /// A participant (or an administrator acting as the system) cancels.
    Cancel {
        /// Who is cancelling.
        cancelled_by: CancelledBy,
        /// Optional reason.
        reason: Option<String>,
    },
    /// The sweep cancels a pending request whose deadline has passed.
    Expire,
}

impl Command {
    /// Returns the status the assignment moves to.
    #[must_use]
    pub const fn target_status(&self) -> AssignmentStatus {
        match self {
            Self::Accept => AssignmentStatus::Accepted,
            Self::Decline { .. } => AssignmentStatus::Declined,
            Self::Complete { .. } => AssignmentStatus::Completed,
            Self::Cancel { .. } | Self::Expire => AssignmentStatus::Cancelled,
        }
    }

    /// Returns the audit action name.
    #[must_use]
    pub const fn action_name(&self) -> &'static str {
        match self {
            Self::Accept => "AcceptAssignment",
            Self::Decline { .. } => "DeclineAssignment",
            Self::Complete { .. } => "CompleteAssignment",
            Self::Cancel { .. } => "CancelAssignment",
            Self::Expire => "ExpireAssignment",
        }
    }
}

/// A hospital's request to create an assignment.
///
/// `availability_slot_id` is the slot the assignment will hold: either a
/// directly booked slot or a sub-slot reserved in the same transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignment {
    pub hospital_id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    pub availability_slot_id: Option<i64>,
    pub priority: Priority,
    /// Fee in cents.
    pub consultation_fee_cents: Option<i64>,
}
