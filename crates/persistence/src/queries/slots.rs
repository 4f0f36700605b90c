// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use chrono::NaiveDate;
use consult_sched_domain::{AssignmentStatus, AvailabilitySlot, SlotStatus, format_date};
use diesel::prelude::*;
use diesel::SqliteConnection;
use tracing::debug;

use crate::data_models::{SlotRow, SubSlotLinkage};
use crate::diesel_schema::{assignments, availability_slots};
use crate::error::PersistenceError;

fn convert(rows: Vec<SlotRow>) -> Result<Vec<AvailabilitySlot>, PersistenceError> {
    rows.into_iter().map(AvailabilitySlot::try_from).collect()
}

/// Retrieves a slot by ID.
///
/// # Errors
///
/// Returns `NotFound` if no slot has this ID.
pub fn get_slot(conn: &mut SqliteConnection, slot_id: i64) -> Result<AvailabilitySlot, PersistenceError> {
    let row: Option<SlotRow> = availability_slots::table
        .filter(availability_slots::slot_id.eq(slot_id))
        .select(SlotRow::as_select())
        .first::<SlotRow>(conn)
        .optional()?;

    row.map_or_else(
        || Err(PersistenceError::NotFound(format!("Slot {slot_id}"))),
        AvailabilitySlot::try_from,
    )
}

/// Lists every slot a doctor has on a date, parents and sub-slots, in start order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_slots_on_date(
    conn: &mut SqliteConnection,
    doctor_id: i64,
    date: NaiveDate,
) -> Result<Vec<AvailabilitySlot>, PersistenceError> {
    let rows: Vec<SlotRow> = availability_slots::table
        .filter(availability_slots::doctor_id.eq(doctor_id))
        .filter(availability_slots::slot_date.eq(format_date(date)))
        .order((
            availability_slots::start_time.asc(),
            availability_slots::slot_id.asc(),
        ))
        .select(SlotRow::as_select())
        .load::<SlotRow>(conn)?;
    convert(rows)
}

/// Lists a doctor's slots of any status with dates in `[start, end]`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_slots_in_window(
    conn: &mut SqliteConnection,
    doctor_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<AvailabilitySlot>, PersistenceError> {
    let rows: Vec<SlotRow> = availability_slots::table
        .filter(availability_slots::doctor_id.eq(doctor_id))
        .filter(availability_slots::slot_date.ge(format_date(start)))
        .filter(availability_slots::slot_date.le(format_date(end)))
        .select(SlotRow::as_select())
        .load::<SlotRow>(conn)?;
    debug!(doctor_id, count = rows.len(), "Loaded slots in window");
    convert(rows)
}

/// Lists the non-cancelled parent slots a doctor has on a date.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_open_parent_slots(
    conn: &mut SqliteConnection,
    doctor_id: i64,
    date: NaiveDate,
) -> Result<Vec<AvailabilitySlot>, PersistenceError> {
    let rows: Vec<SlotRow> = availability_slots::table
        .filter(availability_slots::doctor_id.eq(doctor_id))
        .filter(availability_slots::slot_date.eq(format_date(date)))
        .filter(availability_slots::parent_slot_id.is_null())
        .filter(availability_slots::status.ne(SlotStatus::Cancelled.as_str()))
        .select(SlotRow::as_select())
        .load::<SlotRow>(conn)?;
    convert(rows)
}

/// Lists every sub-slot of a parent, in start order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_sub_slots(
    conn: &mut SqliteConnection,
    parent_slot_id: i64,
) -> Result<Vec<AvailabilitySlot>, PersistenceError> {
    let rows: Vec<SlotRow> = availability_slots::table
        .filter(availability_slots::parent_slot_id.eq(parent_slot_id))
        .order((
            availability_slots::start_time.asc(),
            availability_slots::slot_id.asc(),
        ))
        .select(SlotRow::as_select())
        .load::<SlotRow>(conn)?;
    convert(rows)
}

/// Counts the booked sub-slots of a parent.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_booked_sub_slots(
    conn: &mut SqliteConnection,
    parent_slot_id: i64,
) -> Result<i64, PersistenceError> {
    Ok(availability_slots::table
        .filter(availability_slots::parent_slot_id.eq(parent_slot_id))
        .filter(availability_slots::status.eq(SlotStatus::Booked.as_str()))
        .count()
        .get_result::<i64>(conn)?)
}

/// Lists a parent's sub-slots with the most recent assignment referencing each.
///
/// # Errors
///
/// Returns an error if a query fails or a stored row is malformed.
pub fn list_sub_slot_linkage(
    conn: &mut SqliteConnection,
    parent_slot_id: i64,
) -> Result<Vec<SubSlotLinkage>, PersistenceError> {
    let sub_slots: Vec<AvailabilitySlot> = list_sub_slots(conn, parent_slot_id)?;

    let mut linked: Vec<SubSlotLinkage> = Vec::with_capacity(sub_slots.len());
    for slot in sub_slots {
        let latest: Option<(i64, String)> = assignments::table
            .filter(assignments::availability_slot_id.eq(slot.slot_id))
            .order(assignments::assignment_id.desc())
            .select((assignments::assignment_id, assignments::status))
            .first::<(i64, String)>(conn)
            .optional()?;

        let (assignment_id, assignment_status) = match latest {
            Some((id, status)) => {
                let status: AssignmentStatus = status.parse().map_err(|e| {
                    PersistenceError::SerializationError(format!("stored value rejected: {e}"))
                })?;
                (Some(id), Some(status))
            }
            None => (None, None),
        };

        linked.push(SubSlotLinkage {
            slot,
            assignment_id,
            assignment_status,
        });
    }

    Ok(linked)
}
