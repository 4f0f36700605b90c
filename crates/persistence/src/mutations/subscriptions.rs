// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use consult_sched::EngineConfig;
use consult_sched_domain::{MonthKey, PlanSubscription, format_instant, local_date};
use diesel::SqliteConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use time::OffsetDateTime;
use tracing::info;

use crate::diesel_schema::plan_subscriptions;
use crate::error::PersistenceError;
use crate::mutations::usage::refresh_limit;

/// Records an actor's plan and applies its limit to the current month.
///
/// # Errors
///
/// Returns an error if the upsert or the limit refresh fails.
pub fn upsert_subscription(
    conn: &mut SqliteConnection,
    config: &EngineConfig,
    subscription: &PlanSubscription,
    now: OffsetDateTime,
) -> Result<i32, PersistenceError> {
    let now_str: String = format_instant(now)?;

    diesel::insert_into(plan_subscriptions::table)
        .values((
            plan_subscriptions::actor_id.eq(subscription.actor_id),
            plan_subscriptions::actor_kind.eq(subscription.actor_kind.as_str()),
            plan_subscriptions::tier.eq(subscription.tier.as_str()),
            plan_subscriptions::status.eq(subscription.status.as_str()),
            plan_subscriptions::max_assignments_per_month
                .eq(subscription.max_assignments_per_month),
            plan_subscriptions::updated_at.eq(&now_str),
        ))
        .on_conflict((plan_subscriptions::actor_id, plan_subscriptions::actor_kind))
        .do_update()
        .set((
            plan_subscriptions::tier.eq(excluded(plan_subscriptions::tier)),
            plan_subscriptions::status.eq(excluded(plan_subscriptions::status)),
            plan_subscriptions::max_assignments_per_month
                .eq(excluded(plan_subscriptions::max_assignments_per_month)),
            plan_subscriptions::updated_at.eq(excluded(plan_subscriptions::updated_at)),
        ))
        .execute(conn)?;

    let limit: i32 = config.effective_limit(subscription.actor_kind, Some(subscription));
    let month: MonthKey = MonthKey::from_date(local_date(now, config.timezone)?);
    refresh_limit(
        conn,
        subscription.actor_kind,
        subscription.actor_id,
        month,
        limit,
        &now_str,
    )?;

    info!(
        actor_id = subscription.actor_id,
        actor_kind = %subscription.actor_kind,
        tier = subscription.tier.as_str(),
        status = subscription.status.as_str(),
        limit,
        "Recorded plan subscription"
    );
    Ok(limit)
}
