// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use consult_sched_domain::{ActorKind, DomainError, UsageBand, UsageRecord};
use serde::Serialize;

/// A point-in-time view of an actor's monthly usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStatus {
    pub actor_id: i64,
    pub actor_kind: ActorKind,
    pub month: String,
    pub used: i32,
    pub limit: i32,
    /// `-1` when unlimited.
    pub remaining: i32,
    /// 0 when unlimited.
    pub percentage: i32,
    pub band: UsageBand,
    /// First day of the following month.
    pub reset_date: String,
}

impl UsageStatus {
    /// Builds the status view for a usage record.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset date falls outside the calendar.
    pub fn from_record(record: &UsageRecord) -> Result<Self, DomainError> {
        Ok(Self {
            actor_id: record.actor_id,
            actor_kind: record.actor_kind,
            month: record.month.to_string(),
            used: record.count,
            limit: record.limit,
            remaining: record.remaining(),
            percentage: record.percentage(),
            band: record.band(),
            reset_date: record.month.reset_date_string()?,
        })
    }
}

/// Outcome of the monthly reset job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyResetSummary {
    pub month: String,
    /// Actors whose record for the month now has `count = 0`.
    pub actors_reset: u32,
    /// Records that did not exist before the reset.
    pub records_created: u32,
}

/// Outcome of one expiry sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    /// Pending assignments past their deadline when the sweep started.
    pub found: u32,
    /// Assignments this run moved to `cancelled`.
    pub cancelled: u32,
    /// Slots returned to `available`.
    pub released: u32,
}
