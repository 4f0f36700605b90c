// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use chrono::NaiveDate;
use consult_sched_domain::{LeaveRecord, format_date};
use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::data_models::LeaveRow;
use crate::diesel_schema::doctor_leaves;
use crate::error::PersistenceError;

/// Lists a doctor's leave records that intersect `[start, end]`.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is malformed.
pub fn list_leaves_in_window(
    conn: &mut SqliteConnection,
    doctor_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<LeaveRecord>, PersistenceError> {
    doctor_leaves::table
        .filter(doctor_leaves::doctor_id.eq(doctor_id))
        .filter(doctor_leaves::start_date.le(format_date(end)))
        .filter(doctor_leaves::end_date.ge(format_date(start)))
        .order(doctor_leaves::start_date.asc())
        .select(LeaveRow::as_select())
        .load::<LeaveRow>(conn)?
        .into_iter()
        .map(LeaveRecord::try_from)
        .collect()
}
