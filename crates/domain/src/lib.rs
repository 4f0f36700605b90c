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

mod assignment;
mod calendar;
mod error;
mod leave;
mod quota;
mod recurrence;
mod slot;

#[cfg(test)]
mod tests;

pub use assignment::{
    Assignment, AssignmentStatus, CancelledBy, Priority, validate_consultation_fee,
};
pub use calendar::{
    DATE_FORMAT, TIME_FORMAT, add_days, format_date, format_instant, format_time, local_date,
    local_instant, parse_date, parse_instant, parse_time, parse_timezone, truncate_to_second,
};
pub use error::DomainError;
pub use leave::{LeaveRecord, LeaveType};
pub use quota::{
    ActorKind, MonthKey, PlanSubscription, PlanTier, SubscriptionStatus, UNLIMITED, UsageBand,
    UsageRecord,
};
pub use recurrence::{
    AvailabilityTemplate, RecurrencePattern, format_recurrence_days, parse_recurrence_days,
    parse_weekday_tag, weekday_tag,
};
pub use slot::{
    AvailabilitySlot, SlotStatus, TimeRange, find_overlap, superseded_siblings,
    validate_direct_booking, validate_sub_slot_request,
};
