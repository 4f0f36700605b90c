// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Persistence layer for the consultation scheduling engine.
//!
//! This crate is the system of record for slots, templates, leaves,
//! assignments, usage counters, plan subscriptions, and the audit trail.
//! It is built on Diesel over `SQLite`.
//!
//! ## Atomicity
//!
//! Every composite write runs inside an immediate transaction, which takes
//! the database write lock before the first read. The overlap check for a
//! sub-slot reservation, the quota check, and the status check of a
//! transition therefore see the same state as the writes that follow them.
//! On top of that:
//!
//! - quota increments are conditional updates (`count < limit_count`);
//! - transitions are compare-and-swap updates filtered on the prior status;
//! - a partial unique index allows at most one pending or accepted
//!   assignment per slot.
//!
//! A write that loses a race to a uniqueness constraint or a locked database
//! is retried once. Business-rule failures are never retried.
//!
//! ## Testing
//!
//! Tests run against a unique shared in-memory database per test, with
//! migrations applied. Concurrency tests use a file database in WAL mode.

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

use chrono::NaiveDate;
use consult_sched::{
    Command, EngineConfig, ExpansionRequest, ExpansionSummary, ExpansionWindow, MonthlyResetSummary,
    NewAssignment, SweepSummary, TemplateExpansionReport, TemplatePlan, TransitionResult,
    UsageStatus,
};
use consult_sched_audit::{Actor, AuditEvent, Cause, EntityType};
use consult_sched_domain::{
    ActorKind, Assignment, AvailabilitySlot, AvailabilityTemplate, LeaveRecord, MonthKey,
    PlanSubscription, TimeRange, UsageRecord, format_instant, local_date,
};
use diesel::SqliteConnection;
use num_traits::ToPrimitive;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;
use tracing::{info, warn};

/// Atomic counter for generating unique in-memory database names.
///
/// Each call to `new_in_memory()` receives a unique sequential ID.
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

mod backend;
mod data_models;
mod diesel_schema;
mod error;
mod mutations;
mod queries;

#[cfg(test)]
mod tests;

pub use data_models::{PaymentRecord, SubSlotLinkage};
pub use error::PersistenceError;
pub use mutations::assignments::{CreatedAssignment, SlotRequest};
pub use mutations::sweep::SWEEP_CAUSE_ID;

/// Type alias kept for callers that name the backend explicitly.
pub type SqlitePersistence = Persistence;

/// Persistence adapter over a single `SQLite` connection.
pub struct Persistence {
    pub(crate) conn: SqliteConnection,
}

impl Persistence {
    /// Creates a new persistence adapter with an in-memory `SQLite` database.
    ///
    /// Each call receives a unique shared in-memory database, so tests are
    /// isolated without time-based names.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new_in_memory() -> Result<Self, PersistenceError> {
        let db_id = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let shared_memory_url = format!("file:memdb_test_{db_id}?mode=memory&cache=shared");

        let mut conn: SqliteConnection = backend::sqlite::initialize_database(&shared_memory_url)?;
        backend::sqlite::verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self { conn })
    }

    /// Creates a new persistence adapter with a file-based `SQLite` database.
    ///
    /// Several adapters may open the same file; writers serialize on the
    /// database lock.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the `SQLite` database file
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new_with_file<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path_str = path.as_ref().to_str().ok_or_else(|| {
            PersistenceError::InitializationError("Invalid database path".to_string())
        })?;

        let mut conn: SqliteConnection = backend::sqlite::initialize_database(path_str)?;
        backend::sqlite::enable_wal_mode(&mut conn)?;
        backend::sqlite::verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self { conn })
    }

    /// Runs `f` in an immediate transaction, retrying once on a transient failure.
    fn write<T, F>(&mut self, operation: &'static str, mut f: F) -> Result<T, PersistenceError>
    where
        F: FnMut(&mut SqliteConnection) -> Result<T, PersistenceError>,
    {
        match self.conn.immediate_transaction(&mut f) {
            Err(e) if e.is_transient() => {
                warn!(operation, error = %e, "Retrying after transient write failure");
                self.conn.immediate_transaction(f)
            }
            other => other,
        }
    }

    // ========================================================================
    // Slots
    // ========================================================================

    /// Creates a manual parent slot.
    ///
    /// # Errors
    ///
    /// Returns `SlotOverlap` if it overlaps an open parent slot of the doctor
    /// on the same date, or an error if the write fails.
    pub fn create_slot(
        &mut self,
        slot: AvailabilitySlot,
        now: OffsetDateTime,
    ) -> Result<AvailabilitySlot, PersistenceError> {
        self.write("create_slot", |conn| {
            mutations::slots::create_manual_slot(conn, slot.clone(), now)
        })
    }

    /// Retrieves a slot by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the slot does not exist.
    pub fn get_slot(&mut self, slot_id: i64) -> Result<AvailabilitySlot, PersistenceError> {
        queries::slots::get_slot(&mut self.conn, slot_id)
    }

    /// Lists a doctor's slots on a date.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_slots(
        &mut self,
        doctor_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<AvailabilitySlot>, PersistenceError> {
        queries::slots::list_slots_on_date(&mut self.conn, doctor_id, date)
    }

    /// Lists a parent's sub-slots with their assignment linkage.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the parent does not exist.
    pub fn list_sub_slots(
        &mut self,
        parent_slot_id: i64,
    ) -> Result<Vec<SubSlotLinkage>, PersistenceError> {
        queries::slots::get_slot(&mut self.conn, parent_slot_id)?;
        queries::slots::list_sub_slot_linkage(&mut self.conn, parent_slot_id)
    }

    /// Reserves a booked sub-slot out of a parent for a hospital.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the parent is missing, or the domain error that
    /// rejected the reservation.
    pub fn reserve_sub_slot(
        &mut self,
        parent_slot_id: i64,
        hospital_id: i64,
        range: TimeRange,
        now: OffsetDateTime,
    ) -> Result<AvailabilitySlot, PersistenceError> {
        self.write("reserve_sub_slot", |conn| {
            mutations::slots::reserve_sub_slot(conn, parent_slot_id, hospital_id, range, now)
        })
    }

    /// Releases a booked slot back to `available`.
    ///
    /// Releasing a slot that is not booked is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the slot is missing or `SlotHasActiveAssignment`
    /// while an active assignment holds it.
    pub fn release_slot(
        &mut self,
        slot_id: i64,
        now: OffsetDateTime,
    ) -> Result<AvailabilitySlot, PersistenceError> {
        self.write("release_slot", |conn| {
            mutations::slots::release_unheld_slot(conn, slot_id, now)
        })
    }

    // ========================================================================
    // Templates and leaves
    // ========================================================================

    /// Stores a new availability template.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn create_template(
        &mut self,
        mut template: AvailabilityTemplate,
        now: OffsetDateTime,
    ) -> Result<AvailabilityTemplate, PersistenceError> {
        let now_str: String = format_instant(now)?;
        let template_id: i64 = self.write("create_template", |conn| {
            mutations::templates::insert_template(conn, &template, &now_str)
        })?;
        template.template_id = Some(template_id);
        Ok(template)
    }

    /// Retrieves a template by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the template does not exist.
    pub fn get_template(
        &mut self,
        template_id: i64,
    ) -> Result<AvailabilityTemplate, PersistenceError> {
        queries::templates::get_template(&mut self.conn, template_id)
    }

    /// Marks a template inactive.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the template does not exist.
    pub fn deactivate_template(
        &mut self,
        template_id: i64,
    ) -> Result<AvailabilityTemplate, PersistenceError> {
        self.write("deactivate_template", |conn| {
            mutations::templates::deactivate_template(conn, template_id)
        })
    }

    /// Records a doctor leave.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn record_leave(
        &mut self,
        mut leave: LeaveRecord,
        now: OffsetDateTime,
    ) -> Result<LeaveRecord, PersistenceError> {
        let now_str: String = format_instant(now)?;
        let leave_id: i64 = self.write("record_leave", |conn| {
            mutations::leaves::insert_leave(conn, &leave, &now_str)
        })?;
        leave.leave_id = Some(leave_id);
        Ok(leave)
    }

    /// Generates slots from every selected active template over a window.
    ///
    /// Each template is expanded in its own transaction. A template that
    /// fails is reported in its summary entry and the rest still run.
    ///
    /// # Errors
    ///
    /// Returns an error only if the window cannot be computed or the
    /// templates cannot be listed.
    pub fn expand_templates(
        &mut self,
        config: &EngineConfig,
        request: &ExpansionRequest,
        now: OffsetDateTime,
    ) -> Result<ExpansionSummary, PersistenceError> {
        let today: NaiveDate = local_date(now, config.timezone)?;
        let window: ExpansionWindow = ExpansionWindow::resolve(today, request)?;
        let now_str: String = format_instant(now)?;

        let templates: Vec<AvailabilityTemplate> =
            queries::templates::list_active_templates(&mut self.conn)?
                .into_iter()
                .filter(|t| request.selects(t) && t.intersects(window.start(), window.end()))
                .collect();

        let mut summary: ExpansionSummary = ExpansionSummary::new(&window);
        for template in templates {
            let mut report: TemplateExpansionReport = TemplateExpansionReport::new(&template);
            let outcome: Result<TemplatePlan, PersistenceError> =
                self.write("expand_template", |conn| {
                    mutations::templates::expand_template(conn, &template, &window, &now_str)
                });

            match outcome {
                Ok(plan) => {
                    report.created = plan.slots.len().to_u32().unwrap_or(u32::MAX);
                    report.skipped_existing = plan.skipped_existing;
                    report.skipped_leave = plan.skipped_leave;
                    report.considered_dates = plan.considered_dates;
                }
                Err(e) => {
                    warn!(template_id = template.id(), error = %e, "Template expansion failed");
                    report.error = Some(e.to_string());
                }
            }
            summary.record(report);
        }

        info!(
            start_date = %summary.start_date,
            end_date = %summary.end_date,
            templates_processed = summary.templates_processed,
            slots_created = summary.slots_created,
            "Template expansion complete"
        );
        Ok(summary)
    }

    // ========================================================================
    // Assignments
    // ========================================================================

    /// Creates an assignment together with its slot reservation and quota use.
    ///
    /// # Errors
    ///
    /// Returns the domain error that refused the creation; nothing is written
    /// in that case.
    pub fn create_assignment(
        &mut self,
        config: &EngineConfig,
        request: &NewAssignment,
        slot_request: SlotRequest,
        actor: &Actor,
        cause: &Cause,
        now: OffsetDateTime,
    ) -> Result<CreatedAssignment, PersistenceError> {
        self.write("create_assignment", |conn| {
            mutations::assignments::create_assignment(
                conn,
                config,
                request.clone(),
                slot_request,
                actor.clone(),
                cause.clone(),
                now,
            )
        })
    }

    /// Applies a transition command to an assignment.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or the lifecycle error that rejected the command.
    pub fn transition_assignment(
        &mut self,
        config: &EngineConfig,
        assignment_id: i64,
        command: &Command,
        actor: &Actor,
        cause: &Cause,
        now: OffsetDateTime,
    ) -> Result<TransitionResult, PersistenceError> {
        self.write("transition_assignment", |conn| {
            mutations::assignments::transition_assignment(
                conn,
                config,
                assignment_id,
                command.clone(),
                actor.clone(),
                cause.clone(),
                now,
            )
        })
    }

    /// Retrieves an assignment by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the assignment does not exist.
    pub fn get_assignment(&mut self, assignment_id: i64) -> Result<Assignment, PersistenceError> {
        queries::assignments::get_assignment(&mut self.conn, assignment_id)
    }

    /// Lists every assignment that has referenced a slot.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the slot does not exist.
    pub fn list_assignments_for_slot(
        &mut self,
        slot_id: i64,
    ) -> Result<Vec<Assignment>, PersistenceError> {
        queries::slots::get_slot(&mut self.conn, slot_id)?;
        queries::assignments::list_assignments_for_slot(&mut self.conn, slot_id)
    }

    /// Retrieves the payment settlement for an assignment, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_payment(
        &mut self,
        assignment_id: i64,
    ) -> Result<Option<PaymentRecord>, PersistenceError> {
        queries::assignments::find_payment(&mut self.conn, assignment_id)
    }

    /// Cancels every pending assignment whose response window has elapsed.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails; the sweep then commits nothing.
    pub fn run_expiry_sweep(
        &mut self,
        config: &EngineConfig,
        now: OffsetDateTime,
    ) -> Result<(SweepSummary, Vec<TransitionResult>), PersistenceError> {
        self.write("run_expiry_sweep", |conn| {
            mutations::sweep::sweep_expired(conn, config, now)
        })
    }

    // ========================================================================
    // Usage and subscriptions
    // ========================================================================

    /// Checks an actor's quota for the current month and counts one use.
    ///
    /// # Errors
    ///
    /// Returns `QuotaExceeded` when the limit has been reached.
    pub fn check_and_reserve(
        &mut self,
        config: &EngineConfig,
        actor_kind: ActorKind,
        actor_id: i64,
        now: OffsetDateTime,
    ) -> Result<UsageRecord, PersistenceError> {
        let month: MonthKey = MonthKey::from_date(local_date(now, config.timezone)?);
        self.write("check_and_reserve", |conn| {
            mutations::usage::check_and_reserve(conn, config, actor_kind, actor_id, month, now)
        })
    }

    /// Reports an actor's usage for a month without writing.
    ///
    /// An actor with no record for the month reports a zero count against
    /// the limit its current plan resolves to.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub fn usage_status(
        &mut self,
        config: &EngineConfig,
        actor_kind: ActorKind,
        actor_id: i64,
        month: MonthKey,
    ) -> Result<UsageStatus, PersistenceError> {
        let record: UsageRecord =
            match queries::usage::find_usage_record(&mut self.conn, actor_kind, actor_id, month)? {
                Some(record) => record,
                None => {
                    let limit: i32 =
                        mutations::usage::resolve_limit(&mut self.conn, config, actor_kind, actor_id)?;
                    UsageRecord::fresh(actor_id, actor_kind, month, limit)
                }
            };
        Ok(UsageStatus::from_record(&record)?)
    }

    /// Prepares usage records for `month` for every known actor.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails; nothing is committed in that case.
    pub fn reset_monthly_usage(
        &mut self,
        config: &EngineConfig,
        month: MonthKey,
        now: OffsetDateTime,
    ) -> Result<MonthlyResetSummary, PersistenceError> {
        self.write("reset_monthly_usage", |conn| {
            mutations::usage::reset_month(conn, config, month, now)
        })
    }

    /// Records an actor's plan subscription and returns the limit it resolves to.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn set_subscription(
        &mut self,
        config: &EngineConfig,
        subscription: &PlanSubscription,
        now: OffsetDateTime,
    ) -> Result<i32, PersistenceError> {
        self.write("set_subscription", |conn| {
            mutations::subscriptions::upsert_subscription(conn, config, subscription, now)
        })
    }

    // ========================================================================
    // Audit
    // ========================================================================

    /// Persists an audit event.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn persist_audit_event(
        &mut self,
        event: &AuditEvent,
        now: OffsetDateTime,
    ) -> Result<i64, PersistenceError> {
        let now_str: String = format_instant(now)?;
        mutations::audit::persist_audit_event(&mut self.conn, event, &now_str)
    }

    /// Retrieves an audit event by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the event does not exist.
    pub fn get_audit_event(&mut self, event_id: i64) -> Result<AuditEvent, PersistenceError> {
        queries::audit::get_audit_event(&mut self.conn, event_id)
    }

    /// Lists the audit trail of one entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_audit_events(
        &mut self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<Vec<AuditEvent>, PersistenceError> {
        queries::audit::list_audit_events(&mut self.conn, entity_type, entity_id)
    }
}
