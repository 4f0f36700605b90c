// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Error types for the API layer.

use consult_sched::CoreError;
use consult_sched_domain::DomainError;
use consult_sched_persistence::PersistenceError;

/// Authentication and authorization errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Authentication failed.
    AuthenticationFailed {
        /// The reason authentication failed.
        reason: String,
    },
    /// Authorization failed.
    Unauthorized {
        /// The action that was attempted.
        action: String,
        /// The role required for this action.
        required_role: String,
    },
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationFailed { reason } => {
                write!(f, "Authentication failed: {reason}")
            }
            Self::Unauthorized {
                action,
                required_role,
            } => {
                write!(f, "Unauthorized: '{action}' requires {required_role}")
            }
        }
    }
}

impl std::error::Error for AuthError {}

/// API-level errors.
///
/// These are distinct from domain, core, and storage errors and represent
/// the API contract. Every failure an operation can report is one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// A referenced entity does not exist.
    NotFound {
        /// The type of resource that was not found.
        resource_type: String,
        /// A human-readable description of what was not found.
        message: String,
    },
    /// Time or date bounds are malformed or do not nest.
    InvalidRange {
        /// A human-readable description of the range problem.
        message: String,
    },
    /// The requested time is already taken.
    SlotConflict {
        /// A human-readable description of the conflict.
        message: String,
    },
    /// An actor's monthly quota is exhausted.
    QuotaExceeded {
        /// Assignments already counted this month.
        used: i32,
        /// The effective monthly limit.
        limit: i32,
        /// Capacity left, always 0 here.
        remaining: i32,
    },
    /// The action was attempted past the response deadline.
    Expired {
        /// The deadline that passed (RFC 3339).
        expires_at: String,
    },
    /// The lifecycle forbids the requested transition.
    InvalidTransition {
        /// The current status.
        from: String,
        /// The requested status.
        to: String,
        /// Why the transition was rejected.
        reason: String,
    },
    /// The assignment is already in a terminal status.
    AlreadyFinal {
        /// The terminal status.
        status: String,
    },
    /// A participant tried to cancel too close to the slot start.
    CancellationWindowClosed {
        /// The required notice in hours.
        notice_hours: u32,
    },
    /// Invalid input was provided.
    InvalidInput {
        /// The field that was invalid.
        field: String,
        /// A human-readable description of the error.
        message: String,
    },
    /// Authentication failed.
    AuthenticationFailed {
        /// The reason authentication failed.
        reason: String,
    },
    /// Authorization failed - the actor does not have permission.
    Unauthorized {
        /// The action that was attempted.
        action: String,
        /// The role required for this action.
        required_role: String,
    },
    /// An internal error occurred.
    Internal {
        /// A description of the internal error.
        message: String,
    },
}

impl ApiError {
    /// Returns the stable name of this error's kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::InvalidRange { .. } => "InvalidRange",
            Self::SlotConflict { .. } => "SlotConflict",
            Self::QuotaExceeded { .. } => "QuotaExceeded",
            Self::Expired { .. } => "Expired",
            Self::InvalidTransition { .. } => "InvalidTransition",
            Self::AlreadyFinal { .. } => "AlreadyFinal",
            Self::CancellationWindowClosed { .. } => "CancellationWindowClosed",
            Self::InvalidInput { .. } => "InvalidInput",
            Self::AuthenticationFailed { .. } => "AuthenticationFailed",
            Self::Unauthorized { .. } => "Unauthorized",
            Self::Internal { .. } => "Internal",
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound {
                resource_type,
                message,
            } => write!(f, "{resource_type} not found: {message}"),
            Self::InvalidRange { message } => write!(f, "Invalid range: {message}"),
            Self::SlotConflict { message } => write!(f, "Slot conflict: {message}"),
            Self::QuotaExceeded {
                used,
                limit,
                remaining,
            } => write!(
                f,
                "Monthly quota exceeded: {used} of {limit} used, {remaining} remaining"
            ),
            Self::Expired { expires_at } => {
                write!(f, "Response window closed at {expires_at}")
            }
            Self::InvalidTransition { from, to, reason } => {
                write!(f, "Cannot move from '{from}' to '{to}': {reason}")
            }
            Self::AlreadyFinal { status } => {
                write!(f, "Assignment is already final ({status})")
            }
            Self::CancellationWindowClosed { notice_hours } => write!(
                f,
                "Cancellation requires at least {notice_hours} hours notice before the slot starts"
            ),
            Self::InvalidInput { field, message } => {
                write!(f, "Invalid input for field '{field}': {message}")
            }
            Self::AuthenticationFailed { reason } => {
                write!(f, "Authentication failed: {reason}")
            }
            Self::Unauthorized {
                action,
                required_role,
            } => {
                write!(f, "Unauthorized: '{action}' requires {required_role}")
            }
            Self::Internal { message } => write!(f, "Internal error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AuthenticationFailed { reason } => Self::AuthenticationFailed { reason },
            AuthError::Unauthorized {
                action,
                required_role,
            } => Self::Unauthorized {
                action,
                required_role,
            },
        }
    }
}

/// Storage reports missing rows as `"<Resource> <id>"`; keep the resource words.
fn resource_type_of(message: &str) -> String {
    let words: Vec<&str> = message
        .split_whitespace()
        .take_while(|w| w.chars().all(char::is_alphabetic) && *w != "for")
        .collect();
    if words.is_empty() {
        String::from("Resource")
    } else {
        words.join(" ")
    }
}

fn invalid_input(field: &str, err: &DomainError) -> ApiError {
    ApiError::InvalidInput {
        field: field.to_string(),
        message: err.to_string(),
    }
}

/// Translates a domain error into an API error.
///
/// This translation is explicit and ensures domain errors are not leaked directly.
#[must_use]
pub fn translate_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::InvalidTimeRange { .. }
        | DomainError::RangeOutsideParent { .. }
        | DomainError::InvalidValidityRange { .. }
        | DomainError::InvalidLeaveRange { .. } => ApiError::InvalidRange {
            message: err.to_string(),
        },
        DomainError::SlotOverlap { .. }
        | DomainError::SlotAlreadyBooked { .. }
        | DomainError::SlotHasActiveAssignment { .. } => ApiError::SlotConflict {
            message: err.to_string(),
        },
        // A parent that is not an available top-level slot cannot be booked
        // from, so callers see it the same as a missing one.
        DomainError::SlotNotEligible { .. } | DomainError::NestedSubSlot { .. } => {
            ApiError::NotFound {
                resource_type: String::from("Slot"),
                message: err.to_string(),
            }
        }
        DomainError::SlotDoctorMismatch { .. } => invalid_input("doctor_id", &err),
        DomainError::InvalidStatusTransition { from, to, reason } => {
            ApiError::InvalidTransition { from, to, reason }
        }
        DomainError::AssignmentAlreadyFinal { status } => ApiError::AlreadyFinal { status },
        DomainError::AssignmentExpired { expires_at } => ApiError::Expired { expires_at },
        DomainError::QuotaExceeded { used, limit } => ApiError::QuotaExceeded {
            used,
            limit,
            remaining: (limit - used).max(0),
        },
        DomainError::CancellationWindowClosed { notice_hours } => {
            ApiError::CancellationWindowClosed { notice_hours }
        }
        DomainError::InvalidAssignmentStatus(_) => invalid_input("status", &err),
        DomainError::InvalidSlotStatus(_) => invalid_input("slot_status", &err),
        DomainError::InvalidPriority(_) => invalid_input("priority", &err),
        DomainError::InvalidCancelledBy(_) => invalid_input("cancelled_by", &err),
        DomainError::InvalidRecurrencePattern(_) => invalid_input("recurrence_pattern", &err),
        DomainError::InvalidWeekdayTag(_) | DomainError::MissingRecurrenceDays => {
            invalid_input("recurrence_days", &err)
        }
        DomainError::InvalidTemplateName(_) => invalid_input("template_name", &err),
        DomainError::InvalidActorKind(_) => invalid_input("actor_kind", &err),
        DomainError::InvalidPlanTier(_) => invalid_input("tier", &err),
        DomainError::InvalidSubscriptionStatus(_) => invalid_input("status", &err),
        DomainError::InvalidLeaveType(_) => invalid_input("leave_type", &err),
        DomainError::InvalidConsultationFee(_) => invalid_input("consultation_fee_cents", &err),
        DomainError::InvalidMonthKey(_) => invalid_input("month", &err),
        DomainError::InvalidTimezone(_) => invalid_input("timezone", &err),
        DomainError::DateParseError { .. } => invalid_input("date", &err),
        DomainError::TimeParseError { .. } => invalid_input("time", &err),
        DomainError::InstantFormatError(_) | DomainError::DateArithmeticOverflow { .. } => {
            ApiError::Internal {
                message: err.to_string(),
            }
        }
    }
}

/// Translates a core error into an API error.
///
/// This translation is explicit and ensures core errors are not leaked directly.
#[must_use]
pub fn translate_core_error(err: CoreError) -> ApiError {
    match err {
        CoreError::DomainViolation(domain_err) => translate_domain_error(domain_err),
    }
}

/// Translates a persistence error into an API error.
///
/// Domain rules enforced inside a transaction surface as their domain
/// translation. A conflict that survived the retry is reported as a slot
/// conflict; every other storage failure is internal.
#[must_use]
pub fn translate_persistence_error(err: PersistenceError) -> ApiError {
    match err {
        PersistenceError::Domain(domain_err) => translate_domain_error(domain_err),
        PersistenceError::NotFound(message) => ApiError::NotFound {
            resource_type: resource_type_of(&message),
            message,
        },
        PersistenceError::Conflict(message) => ApiError::SlotConflict { message },
        PersistenceError::Busy(_)
        | PersistenceError::DatabaseError(_)
        | PersistenceError::DatabaseConnectionFailed(_)
        | PersistenceError::MigrationFailed(_)
        | PersistenceError::QueryFailed(_)
        | PersistenceError::SerializationError(_)
        | PersistenceError::InitializationError(_)
        | PersistenceError::ForeignKeyEnforcementNotEnabled => ApiError::Internal {
            message: err.to_string(),
        },
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        translate_persistence_error(err)
    }
}
