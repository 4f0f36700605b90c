// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use consult_sched_domain::{LeaveRecord, format_date};
use diesel::SqliteConnection;
use diesel::prelude::*;
use tracing::info;

use crate::backend::PersistenceBackend;
use crate::diesel_schema::doctor_leaves;
use crate::error::PersistenceError;

/// Records a leave and returns its ID.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_leave(
    conn: &mut SqliteConnection,
    leave: &LeaveRecord,
    now: &str,
) -> Result<i64, PersistenceError> {
    diesel::insert_into(doctor_leaves::table)
        .values((
            doctor_leaves::doctor_id.eq(leave.doctor_id),
            doctor_leaves::leave_type.eq(leave.leave_type.as_str()),
            doctor_leaves::start_date.eq(format_date(leave.start_date)),
            doctor_leaves::end_date.eq(format_date(leave.end_date)),
            doctor_leaves::reason.eq(&leave.reason),
            doctor_leaves::created_at.eq(now),
        ))
        .execute(conn)?;

    let leave_id: i64 = conn.get_last_insert_rowid()?;
    info!(
        leave_id,
        doctor_id = leave.doctor_id,
        leave_type = leave.leave_type.as_str(),
        "Recorded doctor leave"
    );
    Ok(leave_id)
}
