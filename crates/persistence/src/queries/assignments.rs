// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use consult_sched_domain::{Assignment, AssignmentStatus};
use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::data_models::{AssignmentRow, PaymentRecord};
use crate::diesel_schema::{assignment_payments, assignments};
use crate::error::PersistenceError;

/// Retrieves an assignment by ID.
///
/// # Errors
///
/// Returns `NotFound` if no assignment has this ID.
pub fn get_assignment(
    conn: &mut SqliteConnection,
    assignment_id: i64,
) -> Result<Assignment, PersistenceError> {
    let row: Option<AssignmentRow> = assignments::table
        .filter(assignments::assignment_id.eq(assignment_id))
        .select(AssignmentRow::as_select())
        .first::<AssignmentRow>(conn)
        .optional()?;

    row.map_or_else(
        || Err(PersistenceError::NotFound(format!("Assignment {assignment_id}"))),
        Assignment::try_from,
    )
}

/// Lists every assignment that has referenced a slot, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is malformed.
pub fn list_assignments_for_slot(
    conn: &mut SqliteConnection,
    slot_id: i64,
) -> Result<Vec<Assignment>, PersistenceError> {
    assignments::table
        .filter(assignments::availability_slot_id.eq(slot_id))
        .order(assignments::assignment_id.asc())
        .select(AssignmentRow::as_select())
        .load::<AssignmentRow>(conn)?
        .into_iter()
        .map(Assignment::try_from)
        .collect()
}

/// Returns the ID of the pending or accepted assignment holding a slot, if any.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find_active_assignment_for_slot(
    conn: &mut SqliteConnection,
    slot_id: i64,
) -> Result<Option<i64>, PersistenceError> {
    Ok(assignments::table
        .filter(assignments::availability_slot_id.eq(slot_id))
        .filter(assignments::status.eq_any([
            AssignmentStatus::Pending.as_str(),
            AssignmentStatus::Accepted.as_str(),
        ]))
        .select(assignments::assignment_id)
        .first::<i64>(conn)
        .optional()?)
}

/// Lists pending assignments whose deadline is strictly before `now`.
///
/// `now` is a stored-format instant; stored instants compare as text.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is malformed.
pub fn list_expired_pending(
    conn: &mut SqliteConnection,
    now: &str,
) -> Result<Vec<Assignment>, PersistenceError> {
    assignments::table
        .filter(assignments::status.eq(AssignmentStatus::Pending.as_str()))
        .filter(assignments::expires_at.is_not_null())
        .filter(assignments::expires_at.lt(now))
        .order(assignments::assignment_id.asc())
        .select(AssignmentRow::as_select())
        .load::<AssignmentRow>(conn)?
        .into_iter()
        .map(Assignment::try_from)
        .collect()
}

/// Retrieves the payment settlement for an assignment, if one exists.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find_payment(
    conn: &mut SqliteConnection,
    assignment_id: i64,
) -> Result<Option<PaymentRecord>, PersistenceError> {
    Ok(assignment_payments::table
        .filter(assignment_payments::assignment_id.eq(assignment_id))
        .select(PaymentRecord::as_select())
        .first::<PaymentRecord>(conn)
        .optional()?)
}
