// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The expiry sweep.
//!
//! Each expired row is cancelled with the same compare-and-swap update the
//! user-driven transitions use. A row that a concurrent accept or decline
//! already moved out of `pending` is skipped. A storage failure aborts the
//! whole sweep and rolls back every row it touched.

use consult_sched::{
    Command, EngineConfig, SweepSummary, TransitionContext, TransitionResult, apply,
};
use consult_sched_audit::{Actor, Cause};
use consult_sched_domain::{Assignment, format_instant};
use diesel::SqliteConnection;
use num_traits::ToPrimitive;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::error::PersistenceError;
use crate::mutations::assignments::update_assignment_if_status;
use crate::mutations::slots::release_slot;
use crate::queries;

/// Cause recorded on every sweep cancellation.
pub const SWEEP_CAUSE_ID: &str = "expiry-sweep";

/// Cancels every pending assignment whose deadline is before `now`.
///
/// # Errors
///
/// Returns an error if a query or write fails; no partial progress is kept.
pub fn sweep_expired(
    conn: &mut SqliteConnection,
    config: &EngineConfig,
    now: OffsetDateTime,
) -> Result<(SweepSummary, Vec<TransitionResult>), PersistenceError> {
    let now_str: String = format_instant(now)?;
    let expired: Vec<Assignment> = queries::assignments::list_expired_pending(conn, &now_str)?;

    let mut summary: SweepSummary = SweepSummary {
        found: expired.len().to_u32().unwrap_or(u32::MAX),
        cancelled: 0,
        released: 0,
    };
    let mut results: Vec<TransitionResult> = Vec::with_capacity(expired.len());
    let ctx: TransitionContext<'_> = TransitionContext::new(config, now);

    for assignment in expired {
        let result: TransitionResult = match apply(
            &ctx,
            &assignment,
            Command::Expire,
            Actor::system(),
            Cause::new(
                String::from(SWEEP_CAUSE_ID),
                String::from("Response window elapsed"),
            ),
        ) {
            Ok(result) => result,
            Err(e) => {
                debug!(assignment_id = assignment.id(), error = %e, "Skipping assignment");
                continue;
            }
        };

        if update_assignment_if_status(conn, &result.assignment, assignment.status, &now_str)? == 0
        {
            debug!(
                assignment_id = assignment.id(),
                "Assignment moved concurrently, skipping"
            );
            continue;
        }
        summary.cancelled += 1;

        if let Some(slot_id) = assignment.availability_slot_id
            && release_slot(conn, slot_id, &now_str)?
        {
            summary.released += 1;
        }
        results.push(result);
    }

    info!(
        found = summary.found,
        cancelled = summary.cancelled,
        released = summary.released,
        "Expiry sweep complete"
    );
    Ok((summary, results))
}
