// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Assignment lifecycle states and transition rules.
//!
//! ```text
//! pending ──► accepted ──► completed
//!    │           │
//!    │           └──────► cancelled
//!    ├──► declined
//!    └──► cancelled
//! ```
//!
//! `declined`, `completed`, and `cancelled` are terminal.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;

/// Lifecycle status of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Awaiting the doctor's response.
    Pending,
    /// Accepted by the doctor.
    Accepted,
    /// Declined by the doctor.
    Declined,
    /// Cancelled by a participant or by the expiry sweep.
    Cancelled,
    /// Consultation finished.
    Completed,
}

impl AssignmentStatus {
    /// Returns the string representation of the status.
    ///
    /// This is used for persistence and API serialization.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Parses a status from its string representation.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidAssignmentStatus` if the string is not a valid status.
    fn parse_str(s: &str) -> Result<Self, DomainError> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            _ => Err(DomainError::InvalidAssignmentStatus(s.to_string())),
        }
    }

    /// Returns true if this status is terminal (cannot transition to another state).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Declined | Self::Cancelled | Self::Completed)
    }

    /// Returns true if an assignment in this status holds its slot.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }

    /// Validates if a transition from this status to another is permitted.
    ///
    /// # Errors
    ///
    /// - `AssignmentAlreadyFinal` when this status is terminal
    /// - `InvalidStatusTransition` when the lifecycle forbids the move
    pub fn validate_transition(&self, new_status: Self) -> Result<(), DomainError> {
        if self.is_terminal() {
            return Err(DomainError::AssignmentAlreadyFinal {
                status: self.as_str().to_string(),
            });
        }

        let valid = match self {
            Self::Pending => matches!(
                new_status,
                Self::Accepted | Self::Declined | Self::Cancelled
            ),
            Self::Accepted => matches!(new_status, Self::Completed | Self::Cancelled),
            Self::Declined | Self::Cancelled | Self::Completed => false,
        };

        if valid {
            return Ok(());
        }

        let reason: &str = match (self, new_status) {
            (Self::Pending, Self::Completed) => "must be accepted before completion",
            (Self::Accepted, Self::Declined) => "an accepted assignment can only be cancelled",
            _ => "transition not permitted by assignment lifecycle rules",
        };

        Err(DomainError::InvalidStatusTransition {
            from: self.as_str().to_string(),
            to: new_status.as_str().to_string(),
            reason: reason.to_string(),
        })
    }
}

impl FromStr for AssignmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Urgency of a consultation request; selects the response window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Routine,
    Urgent,
    Emergency,
}

impl Priority {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Routine => "routine",
            Self::Urgent => "urgent",
            Self::Emergency => "emergency",
        }
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "routine" => Ok(Self::Routine),
            "urgent" => Ok(Self::Urgent),
            "emergency" => Ok(Self::Emergency),
            _ => Err(DomainError::InvalidPriority(s.to_string())),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which party ended an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Doctor,
    Hospital,
    System,
}

impl CancelledBy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Doctor => "doctor",
            Self::Hospital => "hospital",
            Self::System => "system",
        }
    }
}

impl FromStr for CancelledBy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "doctor" => Ok(Self::Doctor),
            "hospital" => Ok(Self::Hospital),
            "system" => Ok(Self::System),
            _ => Err(DomainError::InvalidCancelledBy(s.to_string())),
        }
    }
}

/// A hospital's request for a doctor to see a patient.
///
/// Assignments are never deleted; terminal rows are the audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Canonical identifier, `None` before persistence.
    pub assignment_id: Option<i64>,
    pub hospital_id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    /// The slot this assignment holds while active.
    pub availability_slot_id: Option<i64>,
    pub status: AssignmentStatus,
    pub priority: Priority,
    pub requested_at: OffsetDateTime,
    /// Response deadline; `None` means no auto-expiry.
    pub expires_at: Option<OffsetDateTime>,
    pub actual_start_time: Option<OffsetDateTime>,
    pub actual_end_time: Option<OffsetDateTime>,
    pub completed_at: Option<OffsetDateTime>,
    pub cancelled_at: Option<OffsetDateTime>,
    pub cancelled_by: Option<CancelledBy>,
    pub cancellation_reason: Option<String>,
    pub treatment_notes: Option<String>,
    /// Fee in cents.
    pub consultation_fee_cents: Option<i64>,
}

impl Assignment {
    /// Returns the canonical ID, or 0 for an unpersisted assignment.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.assignment_id.unwrap_or_default()
    }

    /// Returns true if the response deadline has passed at `now`.
    ///
    /// The deadline is exclusive: at exactly `expires_at` the assignment is expired.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Validates a consultation fee in cents.
///
/// # Errors
///
/// Returns `DomainError::InvalidConsultationFee` for negative fees.
pub const fn validate_consultation_fee(fee_cents: Option<i64>) -> Result<(), DomainError> {
    match fee_cents {
        Some(fee) if fee < 0 => Err(DomainError::InvalidConsultationFee(fee)),
        _ => Ok(()),
    }
}
