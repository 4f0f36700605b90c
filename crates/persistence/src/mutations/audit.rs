// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Append-only writes to the audit trail.

use consult_sched_audit::AuditEvent;
use diesel::SqliteConnection;
use diesel::prelude::*;
use tracing::debug;

use crate::backend::PersistenceBackend;
use crate::data_models::{ActionData, ActorData, CauseData, StateSnapshotData};
use crate::diesel_schema::audit_events;
use crate::error::PersistenceError;

/// JSON columns of one `audit_events` row.
struct EncodedEvent {
    actor: String,
    cause: String,
    action: String,
    before: String,
    after: String,
}

fn encode(event: &AuditEvent) -> Result<EncodedEvent, PersistenceError> {
    Ok(EncodedEvent {
        actor: serde_json::to_string(&ActorData {
            id: event.actor.id.clone(),
            actor_type: event.actor.actor_type.clone(),
        })?,
        cause: serde_json::to_string(&CauseData {
            id: event.cause.id.clone(),
            description: event.cause.description.clone(),
        })?,
        action: serde_json::to_string(&ActionData {
            name: event.action.name.clone(),
            details: event.action.details.clone(),
        })?,
        before: serde_json::to_string(&StateSnapshotData {
            data: event.before.data.clone(),
        })?,
        after: serde_json::to_string(&StateSnapshotData {
            data: event.after.data.clone(),
        })?,
    })
}

/// Appends `event` to the trail and returns its row id.
///
/// `recorded_at` is the already-formatted write instant.
///
/// # Errors
///
/// Fails when a snapshot cannot be encoded or the insert is rejected.
pub fn persist_audit_event(
    conn: &mut SqliteConnection,
    event: &AuditEvent,
    recorded_at: &str,
) -> Result<i64, PersistenceError> {
    let encoded: EncodedEvent = encode(event)?;

    diesel::insert_into(audit_events::table)
        .values((
            audit_events::entity_type.eq(event.entity.entity_type.as_str()),
            audit_events::entity_id.eq(event.entity.entity_id),
            audit_events::actor_json.eq(encoded.actor),
            audit_events::cause_json.eq(encoded.cause),
            audit_events::action_json.eq(encoded.action),
            audit_events::before_snapshot_json.eq(encoded.before),
            audit_events::after_snapshot_json.eq(encoded.after),
            audit_events::created_at.eq(recorded_at),
        ))
        .execute(conn)?;

    let event_id: i64 = conn.get_last_insert_rowid()?;
    debug!(
        event_id,
        entity_id = event.entity.entity_id,
        entity_type = %event.entity.entity_type,
        action = %event.action.name,
        "Audit event stored"
    );
    Ok(event_id)
}
