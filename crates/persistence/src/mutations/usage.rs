// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Monthly quota counters.
//!
//! The increment is a conditional update (`count < limit_count` or
//! unlimited), so the check and the write are one statement and two
//! concurrent reservations cannot both pass a stale check.

use std::collections::BTreeSet;

use consult_sched::{EngineConfig, MonthlyResetSummary};
use consult_sched_domain::{
    ActorKind, DomainError, MonthKey, PlanSubscription, UNLIMITED, UsageRecord, format_instant,
};
use diesel::SqliteConnection;
use diesel::prelude::*;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::diesel_schema::usage_records;
use crate::error::PersistenceError;
use crate::queries;

/// Resolves an actor's effective monthly limit from its recorded subscription.
///
/// # Errors
///
/// Returns an error if the subscription cannot be read.
pub fn resolve_limit(
    conn: &mut SqliteConnection,
    config: &EngineConfig,
    actor_kind: ActorKind,
    actor_id: i64,
) -> Result<i32, PersistenceError> {
    let subscription: Option<PlanSubscription> =
        queries::subscriptions::find_subscription(conn, actor_kind, actor_id)?;
    Ok(config.effective_limit(actor_kind, subscription.as_ref()))
}

/// Returns the actor's record for `month`, creating it with a zero count if absent.
///
/// The boolean is `true` when the record was created by this call.
///
/// # Errors
///
/// Returns an error if a query or insert fails.
pub fn ensure_usage_record(
    conn: &mut SqliteConnection,
    config: &EngineConfig,
    actor_kind: ActorKind,
    actor_id: i64,
    month: MonthKey,
    now: &str,
) -> Result<(UsageRecord, bool), PersistenceError> {
    if let Some(record) = queries::usage::find_usage_record(conn, actor_kind, actor_id, month)? {
        return Ok((record, false));
    }

    let limit: i32 = resolve_limit(conn, config, actor_kind, actor_id)?;
    let inserted: usize = diesel::insert_or_ignore_into(usage_records::table)
        .values((
            usage_records::actor_id.eq(actor_id),
            usage_records::actor_kind.eq(actor_kind.as_str()),
            usage_records::month.eq(month.to_string()),
            usage_records::count.eq(0),
            usage_records::limit_count.eq(limit),
            usage_records::reset_date.eq(month.reset_date_string()?),
            usage_records::created_at.eq(now),
            usage_records::updated_at.eq(now),
        ))
        .execute(conn)?;

    let record: UsageRecord = queries::usage::find_usage_record(conn, actor_kind, actor_id, month)?
        .ok_or_else(|| {
            PersistenceError::NotFound(format!("Usage record for {actor_kind} {actor_id} {month}"))
        })?;

    if inserted > 0 {
        debug!(actor_id, actor_kind = %actor_kind, month = %month, limit, "Created usage record");
    }
    Ok((record, inserted > 0))
}

/// Checks an actor's quota for `month` and counts one more assignment.
///
/// # Errors
///
/// Returns `QuotaExceeded` when the count has reached the limit, or an error
/// if the storage calls fail.
pub fn check_and_reserve(
    conn: &mut SqliteConnection,
    config: &EngineConfig,
    actor_kind: ActorKind,
    actor_id: i64,
    month: MonthKey,
    now: OffsetDateTime,
) -> Result<UsageRecord, PersistenceError> {
    let now_str: String = format_instant(now)?;
    let (record, _) = ensure_usage_record(conn, config, actor_kind, actor_id, month, &now_str)?;
    record.check_capacity()?;

    let updated: usize = diesel::update(
        usage_records::table
            .filter(usage_records::actor_id.eq(actor_id))
            .filter(usage_records::actor_kind.eq(actor_kind.as_str()))
            .filter(usage_records::month.eq(month.to_string()))
            .filter(
                usage_records::limit_count
                    .eq(UNLIMITED)
                    .or(usage_records::count.lt(usage_records::limit_count)),
            ),
    )
    .set((
        usage_records::count.eq(usage_records::count + 1),
        usage_records::updated_at.eq(&now_str),
    ))
    .execute(conn)?;

    if updated == 0 {
        return Err(PersistenceError::Domain(DomainError::QuotaExceeded {
            used: record.count,
            limit: record.limit,
        }));
    }

    debug!(
        actor_id,
        actor_kind = %actor_kind,
        month = %month,
        count = record.count + 1,
        limit = record.limit,
        "Reserved quota"
    );
    Ok(UsageRecord {
        count: record.count + 1,
        ..record
    })
}

/// Prepares `month` for every actor that has a usage record or a subscription.
///
/// Actors without a record for `month` get one with a zero count. An
/// existing record for `month` is zeroed and its limit refreshed from the
/// actor's current plan. Records of other months are left as history.
///
/// # Errors
///
/// Returns an error if a query or write fails.
pub fn reset_month(
    conn: &mut SqliteConnection,
    config: &EngineConfig,
    month: MonthKey,
    now: OffsetDateTime,
) -> Result<MonthlyResetSummary, PersistenceError> {
    let now_str: String = format_instant(now)?;

    let mut actors: BTreeSet<(i64, String)> = BTreeSet::new();
    actors.extend(queries::usage::list_usage_actors(conn)?);
    actors.extend(queries::subscriptions::list_subscribed_actors(conn)?);

    let mut summary: MonthlyResetSummary = MonthlyResetSummary {
        month: month.to_string(),
        actors_reset: 0,
        records_created: 0,
    };

    for (actor_id, kind) in actors {
        let actor_kind: ActorKind = kind.parse().map_err(|e: DomainError| {
            PersistenceError::SerializationError(format!("stored value rejected: {e}"))
        })?;

        let (_, created) =
            ensure_usage_record(conn, config, actor_kind, actor_id, month, &now_str)?;
        if created {
            summary.records_created += 1;
        } else {
            let limit: i32 = resolve_limit(conn, config, actor_kind, actor_id)?;
            zero_usage_record(conn, actor_kind, actor_id, month, limit, &now_str)?;
        }
        summary.actors_reset += 1;
    }

    info!(
        month = %summary.month,
        actors_reset = summary.actors_reset,
        records_created = summary.records_created,
        "Monthly usage reset complete"
    );
    Ok(summary)
}

/// Sets one actor's count for `month` back to zero under `limit`.
///
/// # Errors
///
/// Returns an error if the update fails.
fn zero_usage_record(
    conn: &mut SqliteConnection,
    actor_kind: ActorKind,
    actor_id: i64,
    month: MonthKey,
    limit: i32,
    now: &str,
) -> Result<usize, PersistenceError> {
    Ok(diesel::update(
        usage_records::table
            .filter(usage_records::actor_id.eq(actor_id))
            .filter(usage_records::actor_kind.eq(actor_kind.as_str()))
            .filter(usage_records::month.eq(month.to_string())),
    )
    .set((
        usage_records::count.eq(0),
        usage_records::limit_count.eq(limit),
        usage_records::updated_at.eq(now),
    ))
    .execute(conn)?)
}

/// Overwrites the limit on one actor's record for `month`, if it exists.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn refresh_limit(
    conn: &mut SqliteConnection,
    actor_kind: ActorKind,
    actor_id: i64,
    month: MonthKey,
    limit: i32,
    now: &str,
) -> Result<usize, PersistenceError> {
    Ok(diesel::update(
        usage_records::table
            .filter(usage_records::actor_id.eq(actor_id))
            .filter(usage_records::actor_kind.eq(actor_kind.as_str()))
            .filter(usage_records::month.eq(month.to_string())),
    )
    .set((
        usage_records::limit_count.eq(limit),
        usage_records::updated_at.eq(now),
    ))
    .execute(conn)?)
}
