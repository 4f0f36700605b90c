// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use consult_sched_domain::{ActorKind, MonthKey, UsageRecord};
use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::data_models::UsageRow;
use crate::diesel_schema::usage_records;
use crate::error::PersistenceError;

/// Retrieves one actor's usage record for a month, if it exists.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is malformed.
pub fn find_usage_record(
    conn: &mut SqliteConnection,
    actor_kind: ActorKind,
    actor_id: i64,
    month: MonthKey,
) -> Result<Option<UsageRecord>, PersistenceError> {
    usage_records::table
        .filter(usage_records::actor_id.eq(actor_id))
        .filter(usage_records::actor_kind.eq(actor_kind.as_str()))
        .filter(usage_records::month.eq(month.to_string()))
        .select(UsageRow::as_select())
        .first::<UsageRow>(conn)
        .optional()?
        .map(UsageRecord::try_from)
        .transpose()
}

/// Lists every `(actor_id, actor_kind)` that has ever had a usage record.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_usage_actors(
    conn: &mut SqliteConnection,
) -> Result<Vec<(i64, String)>, PersistenceError> {
    Ok(usage_records::table
        .select((usage_records::actor_id, usage_records::actor_kind))
        .distinct()
        .load::<(i64, String)>(conn)?)
}
