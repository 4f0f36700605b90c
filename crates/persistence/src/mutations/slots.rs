// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Slot mutations.
//!
//! Reservation is check-then-write: the sibling overlap check and the insert
//! of the booked sub-slot must run in one immediate transaction so that two
//! overlapping reservations on the same parent cannot both commit.

use consult_sched::book_sub_slot;
use consult_sched_domain::{
    AvailabilitySlot, DomainError, SlotStatus, TimeRange, find_overlap, format_date,
    format_instant, format_time, superseded_siblings, validate_direct_booking,
    validate_sub_slot_request,
};
use diesel::SqliteConnection;
use diesel::prelude::*;
use num_traits::ToPrimitive;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::backend::PersistenceBackend;
use crate::diesel_schema::availability_slots;
use crate::error::PersistenceError;
use crate::queries;

/// Inserts a slot row and returns its ID.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_slot(
    conn: &mut SqliteConnection,
    slot: &AvailabilitySlot,
    now: &str,
) -> Result<i64, PersistenceError> {
    let booked_at: Option<String> = slot.booked_at.map(format_instant).transpose()?;

    diesel::insert_into(availability_slots::table)
        .values((
            availability_slots::doctor_id.eq(slot.doctor_id),
            availability_slots::template_id.eq(slot.template_id),
            availability_slots::parent_slot_id.eq(slot.parent_slot_id),
            availability_slots::slot_date.eq(format_date(slot.slot_date)),
            availability_slots::start_time.eq(format_time(slot.range.start())),
            availability_slots::end_time.eq(format_time(slot.range.end())),
            availability_slots::status.eq(slot.status.as_str()),
            availability_slots::is_manual.eq(slot.is_manual),
            availability_slots::booked_by_hospital_id.eq(slot.booked_by_hospital_id),
            availability_slots::booked_at.eq(booked_at),
            availability_slots::notes.eq(&slot.notes),
            availability_slots::created_at.eq(now),
            availability_slots::updated_at.eq(now),
        ))
        .execute(conn)?;

    conn.get_last_insert_rowid()
}

/// Creates a manual parent slot.
///
/// # Errors
///
/// Returns `SlotOverlap` if the range overlaps one of the doctor's
/// non-cancelled parent slots on the same date.
pub fn create_manual_slot(
    conn: &mut SqliteConnection,
    mut slot: AvailabilitySlot,
    now: OffsetDateTime,
) -> Result<AvailabilitySlot, PersistenceError> {
    let existing: Vec<AvailabilitySlot> =
        queries::slots::list_open_parent_slots(conn, slot.doctor_id, slot.slot_date)?;
    if let Some(conflict) = find_overlap(&slot.range, &existing) {
        return Err(PersistenceError::Domain(DomainError::SlotOverlap {
            requested: slot.range.to_string(),
            conflicting_slot_id: conflict.id(),
        }));
    }

    let slot_id: i64 = insert_slot(conn, &slot, &format_instant(now)?)?;
    slot.slot_id = Some(slot_id);
    info!(
        slot_id,
        doctor_id = slot.doctor_id,
        date = %format_date(slot.slot_date),
        range = %slot.range,
        "Created manual slot"
    );
    Ok(slot)
}

/// Reserves a sub-range of a parent slot for a hospital.
///
/// Released siblings overlapping the range are cancelled in the same unit
/// of work; booked siblings block the reservation.
///
/// # Errors
///
/// Returns `NotFound` if the parent does not exist, or a domain error if the
/// parent is ineligible, the range falls outside it, or a booked sibling
/// overlaps it.
pub fn reserve_sub_slot(
    conn: &mut SqliteConnection,
    parent_slot_id: i64,
    hospital_id: i64,
    range: TimeRange,
    now: OffsetDateTime,
) -> Result<AvailabilitySlot, PersistenceError> {
    let parent: AvailabilitySlot = queries::slots::get_slot(conn, parent_slot_id)?;
    let siblings: Vec<AvailabilitySlot> = queries::slots::list_sub_slots(conn, parent_slot_id)?;
    validate_sub_slot_request(&parent, &range, &siblings)?;

    let now_str: String = format_instant(now)?;
    let superseded: Vec<i64> = superseded_siblings(&range, &siblings);
    if !superseded.is_empty() {
        let cancelled: usize = cancel_available_slots(conn, &superseded, &now_str)?;
        debug!(parent_slot_id, cancelled, "Cancelled superseded sub-slots");
    }

    let mut sub_slot: AvailabilitySlot = book_sub_slot(&parent, hospital_id, range, now);
    let slot_id: i64 = insert_slot(conn, &sub_slot, &now_str)?;
    sub_slot.slot_id = Some(slot_id);

    info!(
        slot_id,
        parent_slot_id,
        hospital_id,
        range = %range,
        "Reserved sub-slot"
    );
    Ok(sub_slot)
}

/// Books an existing slot whole for a hospital.
///
/// # Errors
///
/// Returns `NotFound` if the slot does not exist, `SlotDoctorMismatch` if it
/// belongs to another doctor, `SlotAlreadyBooked` if it or one of its
/// sub-slots is booked, or `SlotNotEligible` if it is cancelled. The api
/// layer reports `SlotNotEligible` as not found on this path too: a
/// cancelled slot is treated as gone, while a booked one is a conflict.
pub fn book_slot_directly(
    conn: &mut SqliteConnection,
    slot_id: i64,
    doctor_id: i64,
    hospital_id: i64,
    now: OffsetDateTime,
) -> Result<AvailabilitySlot, PersistenceError> {
    let mut slot: AvailabilitySlot = queries::slots::get_slot(conn, slot_id)?;
    if slot.doctor_id != doctor_id {
        return Err(PersistenceError::Domain(DomainError::SlotDoctorMismatch {
            slot_id,
            doctor_id,
        }));
    }

    let booked_sub_slots: i64 = if slot.is_sub_slot() {
        0
    } else {
        queries::slots::count_booked_sub_slots(conn, slot_id)?
    };
    validate_direct_booking(&slot, booked_sub_slots.to_usize().unwrap_or(usize::MAX))?;

    let now_str: String = format_instant(now)?;
    let updated: usize = diesel::update(
        availability_slots::table
            .filter(availability_slots::slot_id.eq(slot_id))
            .filter(availability_slots::status.eq(SlotStatus::Available.as_str())),
    )
    .set((
        availability_slots::status.eq(SlotStatus::Booked.as_str()),
        availability_slots::booked_by_hospital_id.eq(Some(hospital_id)),
        availability_slots::booked_at.eq(Some(now_str.clone())),
        availability_slots::updated_at.eq(&now_str),
    ))
    .execute(conn)?;

    if updated == 0 {
        return Err(PersistenceError::Domain(DomainError::SlotAlreadyBooked { slot_id }));
    }

    slot.status = SlotStatus::Booked;
    slot.booked_by_hospital_id = Some(hospital_id);
    slot.booked_at = Some(now);
    info!(slot_id, hospital_id, "Booked slot");
    Ok(slot)
}

/// Returns a booked slot to `available` and clears its booking fields.
///
/// Returns `true` if the slot changed; a slot that is not booked is left alone.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn release_slot(
    conn: &mut SqliteConnection,
    slot_id: i64,
    now: &str,
) -> Result<bool, PersistenceError> {
    let updated: usize = diesel::update(
        availability_slots::table
            .filter(availability_slots::slot_id.eq(slot_id))
            .filter(availability_slots::status.eq(SlotStatus::Booked.as_str())),
    )
    .set((
        availability_slots::status.eq(SlotStatus::Available.as_str()),
        availability_slots::booked_by_hospital_id.eq(None::<i64>),
        availability_slots::booked_at.eq(None::<String>),
        availability_slots::updated_at.eq(now),
    ))
    .execute(conn)?;

    if updated > 0 {
        debug!(slot_id, "Released slot");
    }
    Ok(updated > 0)
}

/// Releases a slot on request, refusing while an active assignment holds it.
///
/// # Errors
///
/// Returns `NotFound` if the slot does not exist or
/// `SlotHasActiveAssignment` if a pending or accepted assignment references it.
pub fn release_unheld_slot(
    conn: &mut SqliteConnection,
    slot_id: i64,
    now: OffsetDateTime,
) -> Result<AvailabilitySlot, PersistenceError> {
    let slot: AvailabilitySlot = queries::slots::get_slot(conn, slot_id)?;
    if slot.status != SlotStatus::Booked {
        return Ok(slot);
    }

    if let Some(assignment_id) = queries::assignments::find_active_assignment_for_slot(conn, slot_id)? {
        return Err(PersistenceError::Domain(DomainError::SlotHasActiveAssignment {
            slot_id,
            assignment_id,
        }));
    }

    release_slot(conn, slot_id, &format_instant(now)?)?;
    info!(slot_id, "Released slot on request");
    queries::slots::get_slot(conn, slot_id)
}

/// Cancels the listed slots that are still `available`.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn cancel_available_slots(
    conn: &mut SqliteConnection,
    slot_ids: &[i64],
    now: &str,
) -> Result<usize, PersistenceError> {
    Ok(diesel::update(
        availability_slots::table
            .filter(availability_slots::slot_id.eq_any(slot_ids))
            .filter(availability_slots::status.eq(SlotStatus::Available.as_str())),
    )
    .set((
        availability_slots::status.eq(SlotStatus::Cancelled.as_str()),
        availability_slots::updated_at.eq(now),
    ))
    .execute(conn)?)
}
