// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Audit trail queries.

use consult_sched_audit::{AuditEvent, EntityType};
use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::data_models::AuditEventRow;
use crate::diesel_schema::audit_events;
use crate::error::PersistenceError;

/// Retrieves an audit event by ID.
///
/// # Errors
///
/// Returns `NotFound` if the event does not exist, or an error if it cannot
/// be deserialized.
pub fn get_audit_event(
    conn: &mut SqliteConnection,
    event_id: i64,
) -> Result<AuditEvent, PersistenceError> {
    let row: Option<AuditEventRow> = audit_events::table
        .filter(audit_events::event_id.eq(event_id))
        .select(AuditEventRow::as_select())
        .first::<AuditEventRow>(conn)
        .optional()?;

    row.map_or_else(
        || Err(PersistenceError::NotFound(format!("Audit event {event_id}"))),
        AuditEvent::try_from,
    )
}

/// Lists the audit trail of one entity in the order it was recorded.
///
/// # Errors
///
/// Returns an error if the query fails or an event cannot be deserialized.
pub fn list_audit_events(
    conn: &mut SqliteConnection,
    entity_type: EntityType,
    entity_id: i64,
) -> Result<Vec<AuditEvent>, PersistenceError> {
    audit_events::table
        .filter(audit_events::entity_type.eq(entity_type.as_str()))
        .filter(audit_events::entity_id.eq(entity_id))
        .order(audit_events::event_id.asc())
        .select(AuditEventRow::as_select())
        .load::<AuditEventRow>(conn)?
        .into_iter()
        .map(AuditEvent::try_from)
        .collect()
}
