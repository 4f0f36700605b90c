// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Availability slots and the parent/sub-slot partition rules.
//!
//! Slots form a strict two-level arena:
//!
//! - A parent slot (`parent_slot_id = None`) is a doctor-declared block.
//! - A sub-slot names its parent and is carved out of the parent's range
//!   when a hospital reserves part of it. Sub-slots never have children.
//!
//! ## Invariants
//!
//! - A sub-slot's range lies within its parent's range.
//! - Non-cancelled sub-slots of one parent never overlap each other.
//! - Only `booked` siblings block a new reservation. Released (`available`)
//!   siblings that overlap a new reservation are superseded and must be
//!   cancelled in the same unit of work.

use crate::calendar::{format_time, parse_time};
use crate::error::DomainError;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;

/// Booking status of an availability slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    /// Open for booking.
    Available,
    /// Reserved by a hospital.
    Booked,
    /// Withdrawn; never booked again.
    Cancelled,
}

impl SlotStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Booked => "booked",
            Self::Cancelled => "cancelled",
        }
    }

    fn parse_str(s: &str) -> Result<Self, DomainError> {
        match s {
            "available" => Ok(Self::Available),
            "booked" => Ok(Self::Booked),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(DomainError::InvalidSlotStatus(s.to_string())),
        }
    }
}

impl FromStr for SlotStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl std::fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A half-open wall-clock range `[start, end)` with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeRange {
    /// Creates a new range.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTimeRange` if `start >= end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, DomainError> {
        if start >= end {
            return Err(DomainError::InvalidTimeRange {
                start: format_time(start),
                end: format_time(end),
            });
        }
        Ok(Self { start, end })
    }

    /// Parses a range from two wall-clock strings.
    ///
    /// # Errors
    ///
    /// Returns an error if either time fails to parse or the range is empty.
    pub fn parse(start: &str, end: &str) -> Result<Self, DomainError> {
        Self::new(parse_time(start)?, parse_time(end)?)
    }

    /// Returns the inclusive start.
    #[must_use]
    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    /// Returns the exclusive end.
    #[must_use]
    pub const fn end(&self) -> NaiveTime {
        self.end
    }

    /// Returns true if the two ranges share any instant.
    ///
    /// Touching ranges (`09:00-10:00` and `10:00-11:00`) do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if `other` lies entirely within this range.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", format_time(self.start), format_time(self.end))
    }
}

/// A concrete bookable time range for one doctor on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilitySlot {
    /// Canonical identifier, `None` before persistence.
    pub slot_id: Option<i64>,
    /// Owning doctor.
    pub doctor_id: i64,
    /// Template that generated this slot, if any.
    pub template_id: Option<i64>,
    /// Parent slot for sub-slots; `None` for parent slots.
    pub parent_slot_id: Option<i64>,
    /// Calendar date in the operational timezone.
    pub slot_date: NaiveDate,
    /// Wall-clock range.
    pub range: TimeRange,
    /// Booking status.
    pub status: SlotStatus,
    /// True when declared by hand rather than generated.
    pub is_manual: bool,
    /// Hospital holding the booking.
    pub booked_by_hospital_id: Option<i64>,
    /// When the booking was taken.
    pub booked_at: Option<OffsetDateTime>,
    /// Free-form notes.
    pub notes: Option<String>,
}

impl AvailabilitySlot {
    /// Creates a new unbooked manual parent slot.
    #[must_use]
    pub const fn new_manual(doctor_id: i64, slot_date: NaiveDate, range: TimeRange) -> Self {
        Self {
            slot_id: None,
            doctor_id,
            template_id: None,
            parent_slot_id: None,
            slot_date,
            range,
            status: SlotStatus::Available,
            is_manual: true,
            booked_by_hospital_id: None,
            booked_at: None,
            notes: None,
        }
    }

    /// Returns true if this slot was carved out of a parent.
    #[must_use]
    pub const fn is_sub_slot(&self) -> bool {
        self.parent_slot_id.is_some()
    }

    /// Returns the canonical ID, or 0 for an unpersisted slot.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.slot_id.unwrap_or_default()
    }
}

/// Returns the first slot in `existing` whose range overlaps `range`.
///
/// Callers pre-filter `existing` to the statuses that should block.
pub fn find_overlap<'a, I>(range: &TimeRange, existing: I) -> Option<&'a AvailabilitySlot>
where
    I: IntoIterator<Item = &'a AvailabilitySlot>,
{
    existing
        .into_iter()
        .find(|slot| slot.range.overlaps(range))
}

/// Validates a sub-slot reservation request against its parent and siblings.
///
/// # Arguments
///
/// * `parent` - The slot the sub-range is carved from
/// * `requested` - The requested sub-range
/// * `siblings` - Every existing sub-slot of `parent`
///
/// # Errors
///
/// - `NestedSubSlot` if `parent` is itself a sub-slot
/// - `SlotNotEligible` if `parent` is not `available`
/// - `RangeOutsideParent` if `requested` is not within `parent.range`
/// - `SlotOverlap` if a `booked` sibling overlaps `requested`
pub fn validate_sub_slot_request(
    parent: &AvailabilitySlot,
    requested: &TimeRange,
    siblings: &[AvailabilitySlot],
) -> Result<(), DomainError> {
    if parent.is_sub_slot() {
        return Err(DomainError::NestedSubSlot {
            slot_id: parent.id(),
        });
    }

    if parent.status != SlotStatus::Available {
        return Err(DomainError::SlotNotEligible {
            slot_id: parent.id(),
            status: parent.status.as_str().to_string(),
        });
    }

    if !parent.range.contains(requested) {
        return Err(DomainError::RangeOutsideParent {
            requested: requested.to_string(),
            parent: parent.range.to_string(),
        });
    }

    let booked = siblings
        .iter()
        .filter(|s| s.status == SlotStatus::Booked);
    if let Some(conflict) = find_overlap(requested, booked) {
        return Err(DomainError::SlotOverlap {
            requested: requested.to_string(),
            conflicting_slot_id: conflict.id(),
        });
    }

    Ok(())
}

/// Returns released siblings that a new reservation of `requested` supersedes.
#[must_use]
pub fn superseded_siblings(requested: &TimeRange, siblings: &[AvailabilitySlot]) -> Vec<i64> {
    siblings
        .iter()
        .filter(|s| s.status == SlotStatus::Available && s.range.overlaps(requested))
        .map(AvailabilitySlot::id)
        .collect()
}

/// Validates booking a slot directly by ID.
///
/// A parent with booked sub-slots is partially taken and cannot be booked whole.
///
/// # Errors
///
/// - `SlotAlreadyBooked` if the slot or one of its sub-slots is booked
/// - `SlotNotEligible` if the slot is cancelled, the same variant a
///   reservation on an unavailable parent yields
pub fn validate_direct_booking(
    slot: &AvailabilitySlot,
    booked_sub_slots: usize,
) -> Result<(), DomainError> {
    match slot.status {
        SlotStatus::Booked => Err(DomainError::SlotAlreadyBooked { slot_id: slot.id() }),
        SlotStatus::Cancelled => Err(DomainError::SlotNotEligible {
            slot_id: slot.id(),
            status: slot.status.as_str().to_string(),
        }),
        SlotStatus::Available if booked_sub_slots > 0 => {
            Err(DomainError::SlotAlreadyBooked { slot_id: slot.id() })
        }
        SlotStatus::Available => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::calendar::parse_date;

    fn range(start: &str, end: &str) -> TimeRange {
        TimeRange::parse(start, end).unwrap()
    }

    fn parent() -> AvailabilitySlot {
        let mut slot = AvailabilitySlot::new_manual(
            7,
            parse_date("2024-11-15").unwrap(),
            range("09:00", "12:00"),
        );
        slot.slot_id = Some(1);
        slot
    }

    fn sub_slot(id: i64, start: &str, end: &str, status: SlotStatus) -> AvailabilitySlot {
        let mut slot = parent();
        slot.slot_id = Some(id);
        slot.parent_slot_id = Some(1);
        slot.range = range(start, end);
        slot.status = status;
        slot
    }

    #[test]
    fn test_empty_range_is_rejected() {
        assert!(matches!(
            TimeRange::parse("10:00", "10:00"),
            Err(DomainError::InvalidTimeRange { .. })
        ));
        assert!(TimeRange::parse("11:00", "10:00").is_err());
    }

    #[test]
    fn test_touching_ranges_do_not_overlap() {
        assert!(!range("09:00", "10:00").overlaps(&range("10:00", "11:00")));
        assert!(range("09:00", "10:00").overlaps(&range("09:30", "10:30")));
    }

    #[test]
    fn test_sub_slot_must_fit_parent() {
        let result = validate_sub_slot_request(&parent(), &range("11:30", "12:30"), &[]);
        assert!(matches!(
            result,
            Err(DomainError::RangeOutsideParent { .. })
        ));
    }

    #[test]
    fn test_booked_sibling_blocks_overlap() {
        let siblings = vec![sub_slot(2, "09:00", "10:00", SlotStatus::Booked)];
        let result = validate_sub_slot_request(&parent(), &range("09:30", "10:30"), &siblings);
        assert_eq!(
            result,
            Err(DomainError::SlotOverlap {
                requested: String::from("09:30:00-10:30:00"),
                conflicting_slot_id: 2,
            })
        );
    }

    #[test]
    fn test_released_sibling_is_superseded_not_blocking() {
        let siblings = vec![
            sub_slot(2, "09:00", "10:00", SlotStatus::Available),
            sub_slot(3, "11:00", "12:00", SlotStatus::Available),
        ];
        let requested = range("09:30", "10:30");
        assert!(validate_sub_slot_request(&parent(), &requested, &siblings).is_ok());
        assert_eq!(superseded_siblings(&requested, &siblings), vec![2]);
    }

    #[test]
    fn test_sub_slot_cannot_be_a_parent() {
        let nested = sub_slot(2, "09:00", "10:00", SlotStatus::Available);
        assert_eq!(
            validate_sub_slot_request(&nested, &range("09:00", "09:30"), &[]),
            Err(DomainError::NestedSubSlot { slot_id: 2 })
        );
    }

    #[test]
    fn test_direct_booking_rejects_partially_taken_parent() {
        assert_eq!(
            validate_direct_booking(&parent(), 1),
            Err(DomainError::SlotAlreadyBooked { slot_id: 1 })
        );
        assert!(validate_direct_booking(&parent(), 0).is_ok());
    }
}
