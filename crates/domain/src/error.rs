// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

/// Errors that can occur during domain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A time range has a start at or after its end.
    InvalidTimeRange {
        /// The requested start time.
        start: String,
        /// The requested end time.
        end: String,
    },
    /// A requested sub-slot range does not lie within its parent slot.
    RangeOutsideParent {
        /// The requested range.
        requested: String,
        /// The parent slot's range.
        parent: String,
    },
    /// A requested range overlaps an existing slot.
    SlotOverlap {
        /// The requested range.
        requested: String,
        /// The slot that conflicts with the request.
        conflicting_slot_id: i64,
    },
    /// A slot cannot be used as a reservation parent in its current state.
    SlotNotEligible {
        /// The slot identifier.
        slot_id: i64,
        /// The slot's current status.
        status: String,
    },
    /// A slot is already booked and cannot be booked again.
    SlotAlreadyBooked {
        /// The slot identifier.
        slot_id: i64,
    },
    /// A sub-slot was used as the parent of another sub-slot.
    NestedSubSlot {
        /// The sub-slot that was used as a parent.
        slot_id: i64,
    },
    /// A slot does not belong to the doctor named in the request.
    SlotDoctorMismatch {
        /// The slot identifier.
        slot_id: i64,
        /// The doctor named in the request.
        doctor_id: i64,
    },
    /// A slot is still referenced by an active assignment.
    SlotHasActiveAssignment {
        /// The slot identifier.
        slot_id: i64,
        /// The active assignment referencing the slot.
        assignment_id: i64,
    },
    /// A status transition is not permitted by the assignment lifecycle.
    InvalidStatusTransition {
        /// The current status.
        from: String,
        /// The requested status.
        to: String,
        /// Why the transition was rejected.
        reason: String,
    },
    /// The assignment is in a terminal status.
    AssignmentAlreadyFinal {
        /// The terminal status the assignment is in.
        status: String,
    },
    /// The assignment's response deadline has passed.
    AssignmentExpired {
        /// The deadline that passed (RFC 3339).
        expires_at: String,
    },
    /// The actor's monthly quota is exhausted.
    QuotaExceeded {
        /// Assignments already counted this month.
        used: i32,
        /// The effective monthly limit.
        limit: i32,
    },
    /// The slot starts too soon to be cancelled by a participant.
    CancellationWindowClosed {
        /// The required notice in hours.
        notice_hours: u32,
    },
    /// Assignment status string is not recognized.
    InvalidAssignmentStatus(String),
    /// Slot status string is not recognized.
    InvalidSlotStatus(String),
    /// Priority string is not recognized.
    InvalidPriority(String),
    /// Cancellation origin string is not recognized.
    InvalidCancelledBy(String),
    /// Recurrence pattern string is not recognized.
    InvalidRecurrencePattern(String),
    /// Weekday tag is not one of `sun`..`sat`.
    InvalidWeekdayTag(String),
    /// A weekly or custom template has no recurrence days.
    MissingRecurrenceDays,
    /// A template's validity window ends before it starts.
    InvalidValidityRange {
        /// First valid date.
        valid_from: String,
        /// Last valid date.
        valid_until: String,
    },
    /// Template name is empty.
    InvalidTemplateName(String),
    /// Actor kind string is not recognized.
    InvalidActorKind(String),
    /// Plan tier string is not recognized.
    InvalidPlanTier(String),
    /// Subscription status string is not recognized.
    InvalidSubscriptionStatus(String),
    /// Leave type string is not recognized.
    InvalidLeaveType(String),
    /// A leave ends before it starts.
    InvalidLeaveRange {
        /// First day of leave.
        start_date: String,
        /// Last day of leave.
        end_date: String,
    },
    /// Consultation fee is negative.
    InvalidConsultationFee(i64),
    /// Month key is not `YYYY-MM`.
    InvalidMonthKey(String),
    /// Timezone is not a known IANA name.
    InvalidTimezone(String),
    /// Failed to parse date from string.
    DateParseError {
        /// The invalid date string.
        date_string: String,
        /// The parsing error message.
        error: String,
    },
    /// Failed to parse a wall-clock time from string.
    TimeParseError {
        /// The invalid time string.
        time_string: String,
        /// The parsing error message.
        error: String,
    },
    /// Failed to parse or format an instant.
    InstantFormatError(String),
    /// Date arithmetic overflow.
    DateArithmeticOverflow {
        /// Description of the operation that failed.
        operation: String,
    },
}

impl std::fmt::Display for DomainError {
    #[allow(clippy::too_many_lines)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTimeRange { start, end } => {
                write!(f, "Invalid time range: start {start} must be before end {end}")
            }
            Self::RangeOutsideParent { requested, parent } => {
                write!(
                    f,
                    "Requested range {requested} is outside the parent slot range {parent}"
                )
            }
            Self::SlotOverlap {
                requested,
                conflicting_slot_id,
            } => {
                write!(
                    f,
                    "Requested range {requested} overlaps slot {conflicting_slot_id}"
                )
            }
            Self::SlotNotEligible { slot_id, status } => {
                write!(f, "Slot {slot_id} is not available for booking (status '{status}')")
            }
            Self::SlotAlreadyBooked { slot_id } => write!(f, "Slot {slot_id} is already booked"),
            Self::NestedSubSlot { slot_id } => {
                write!(f, "Slot {slot_id} is a sub-slot and cannot have sub-slots")
            }
            Self::SlotDoctorMismatch { slot_id, doctor_id } => {
                write!(f, "Slot {slot_id} does not belong to doctor {doctor_id}")
            }
            Self::SlotHasActiveAssignment {
                slot_id,
                assignment_id,
            } => {
                write!(
                    f,
                    "Slot {slot_id} is held by active assignment {assignment_id}"
                )
            }
            Self::InvalidStatusTransition { from, to, reason } => {
                write!(f, "Cannot transition from '{from}' to '{to}': {reason}")
            }
            Self::AssignmentAlreadyFinal { status } => {
                write!(f, "Assignment is already final with status '{status}'")
            }
            Self::AssignmentExpired { expires_at } => {
                write!(f, "Assignment expired at {expires_at}")
            }
            Self::QuotaExceeded { used, limit } => {
                write!(
                    f,
                    "Monthly assignment limit reached: {used} of {limit} used, 0 remaining"
                )
            }
            Self::CancellationWindowClosed { notice_hours } => {
                write!(
                    f,
                    "Cancellation requires at least {notice_hours} hours notice before the slot starts"
                )
            }
            Self::InvalidAssignmentStatus(s) => write!(f, "Invalid assignment status: {s}"),
            Self::InvalidSlotStatus(s) => write!(f, "Invalid slot status: {s}"),
            Self::InvalidPriority(s) => write!(f, "Invalid priority: {s}"),
            Self::InvalidCancelledBy(s) => write!(f, "Invalid cancellation origin: {s}"),
            Self::InvalidRecurrencePattern(s) => write!(f, "Invalid recurrence pattern: {s}"),
            Self::InvalidWeekdayTag(s) => write!(f, "Invalid weekday tag: {s}"),
            Self::MissingRecurrenceDays => {
                write!(f, "Weekly and custom templates require at least one recurrence day")
            }
            Self::InvalidValidityRange {
                valid_from,
                valid_until,
            } => {
                write!(
                    f,
                    "Template validity ends ({valid_until}) before it starts ({valid_from})"
                )
            }
            Self::InvalidTemplateName(msg) => write!(f, "Invalid template name: {msg}"),
            Self::InvalidActorKind(s) => write!(f, "Invalid actor kind: {s}"),
            Self::InvalidPlanTier(s) => write!(f, "Invalid plan tier: {s}"),
            Self::InvalidSubscriptionStatus(s) => write!(f, "Invalid subscription status: {s}"),
            Self::InvalidLeaveType(s) => write!(f, "Invalid leave type: {s}"),
            Self::InvalidLeaveRange {
                start_date,
                end_date,
            } => {
                write!(f, "Leave ends ({end_date}) before it starts ({start_date})")
            }
            Self::InvalidConsultationFee(fee) => {
                write!(f, "Consultation fee must not be negative, got {fee}")
            }
            Self::InvalidMonthKey(s) => write!(f, "Invalid month key '{s}': expected YYYY-MM"),
            Self::InvalidTimezone(s) => write!(f, "Invalid timezone: {s}"),
            Self::DateParseError { date_string, error } => {
                write!(f, "Failed to parse date '{date_string}': {error}")
            }
            Self::TimeParseError { time_string, error } => {
                write!(f, "Failed to parse time '{time_string}': {error}")
            }
            Self::InstantFormatError(msg) => write!(f, "Invalid timestamp: {msg}"),
            Self::DateArithmeticOverflow { operation } => {
                write!(f, "Date arithmetic overflow while {operation}")
            }
        }
    }
}

impl std::error::Error for DomainError {}
