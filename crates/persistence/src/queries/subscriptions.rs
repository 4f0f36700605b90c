// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use consult_sched_domain::{ActorKind, PlanSubscription};
use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::data_models::SubscriptionRow;
use crate::diesel_schema::plan_subscriptions;
use crate::error::PersistenceError;

/// Retrieves an actor's subscription, if one has been recorded.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is malformed.
pub fn find_subscription(
    conn: &mut SqliteConnection,
    actor_kind: ActorKind,
    actor_id: i64,
) -> Result<Option<PlanSubscription>, PersistenceError> {
    plan_subscriptions::table
        .filter(plan_subscriptions::actor_id.eq(actor_id))
        .filter(plan_subscriptions::actor_kind.eq(actor_kind.as_str()))
        .select(SubscriptionRow::as_select())
        .first::<SubscriptionRow>(conn)
        .optional()?
        .map(PlanSubscription::try_from)
        .transpose()
}

/// Lists every `(actor_id, actor_kind)` with a recorded subscription.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_subscribed_actors(
    conn: &mut SqliteConnection,
) -> Result<Vec<(i64, String)>, PersistenceError> {
    Ok(plan_subscriptions::table
        .select((plan_subscriptions::actor_id, plan_subscriptions::actor_kind))
        .load::<(i64, String)>(conn)?)
}
