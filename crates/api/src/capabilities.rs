// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Capability computation for assignment responses.
//!
//! Capabilities tell a caller which transitions would currently succeed
//! for them. They are advisory only and do not replace the checks made
//! when a transition is attempted.

use consult_sched::{Command, EngineConfig, TransitionContext, apply};
use consult_sched_audit::Cause;
use consult_sched_domain::Assignment;
use time::OffsetDateTime;

use crate::auth::{AuthenticatedActor, AuthorizationService};
use crate::request_response::{AssignmentCapabilities, Capability};

/// Computes what `actor` may do next with `assignment`.
///
/// Each candidate command is authorized and then dry-run through the
/// lifecycle rules at `now`; nothing is written.
///
/// # Arguments
///
/// * `actor` - The authenticated caller
/// * `assignment` - The assignment as currently stored
/// * `config` - Engine configuration (deadlines and notice window)
/// * `slot_start` - Start of the linked slot, if any
/// * `now` - The instant to evaluate at
#[must_use]
pub fn compute_assignment_capabilities(
    actor: &AuthenticatedActor,
    assignment: &Assignment,
    config: &EngineConfig,
    slot_start: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> AssignmentCapabilities {
    let ctx: TransitionContext<'_> = TransitionContext::new(config, now).with_slot_start(slot_start);

    let check = |command: Command| -> Capability {
        if AuthorizationService::authorize_transition(actor, assignment, &command).is_err() {
            return Capability::Denied;
        }
        let dry_run = apply(
            &ctx,
            assignment,
            command,
            actor.to_audit_actor(),
            Cause::new(
                String::from("capability_check"),
                String::from("Capability check"),
            ),
        );
        Capability::from_bool(dry_run.is_ok())
    };

    AssignmentCapabilities {
        can_accept: check(Command::Accept),
        can_decline: check(Command::Decline { reason: None }),
        can_complete: check(Command::Complete {
            treatment_notes: None,
        }),
        can_cancel: check(Command::Cancel {
            cancelled_by: actor.cancelled_by(),
            reason: None,
        }),
    }
}
