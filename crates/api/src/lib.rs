// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API boundary layer for the consultation scheduling engine.
//!
//! Callers arrive here already identified as `(id, role)`. This crate
//! authorizes them, parses their requests, drives persistence, and turns
//! every failure into an [`ApiError`]. After a mutation commits, it records
//! the audit event and hands the domain event to a [`Notifier`].

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

mod auth;
mod capabilities;
mod error;
mod handlers;
mod notifier;
mod request_response;

#[cfg(test)]
mod tests;

pub use auth::{AuthenticatedActor, AuthorizationService, Role, authenticate};
pub use capabilities::compute_assignment_capabilities;
pub use error::{
    ApiError, AuthError, translate_core_error, translate_domain_error, translate_persistence_error,
};
pub use handlers::{
    create_assignment, create_slot, create_template, deactivate_template, expand_templates,
    get_assignment, get_slot, get_usage, list_assignments_for_slot, list_audit_events, list_slots,
    list_sub_slots, record_leave, release_slot, reserve_sub_slot, reset_monthly_usage,
    run_expiry_sweep, set_subscription, sweep_expired_assignments, transition_assignment,
};
pub use notifier::{Notifier, NotifyError, TracingNotifier};
pub use request_response::{
    AssignmentCapabilities, AssignmentResponse, AuditEventResponse, Capability,
    CreateAssignmentRequest, CreateAssignmentResponse, CreateSlotRequest, CreateTemplateRequest,
    ExpandTemplatesRequest, LeaveResponse, RecordLeaveRequest, ReserveSubSlotRequest,
    ResetUsageRequest, SetSubscriptionRequest, SlotResponse, SubSlotResponse,
    SubscriptionResponse, SweepResponse, TemplateResponse, TransitionAssignmentRequest,
    TransitionAssignmentResponse,
};
