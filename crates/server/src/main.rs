// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

use axum::{
    Json, Router,
    extract::{Path, Query, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono_tz::Tz;
use clap::Parser;
use consult_sched::{EngineConfig, ExpansionSummary, MonthlyResetSummary, UsageStatus};
use consult_sched_api::{
    ApiError, AssignmentResponse, AuditEventResponse, AuthenticatedActor, CreateAssignmentRequest,
    CreateAssignmentResponse, CreateSlotRequest, CreateTemplateRequest, ExpandTemplatesRequest,
    LeaveResponse, Notifier, RecordLeaveRequest, ReserveSubSlotRequest, ResetUsageRequest,
    SetSubscriptionRequest, SlotResponse, SubSlotResponse, SubscriptionResponse, SweepResponse,
    TemplateResponse, TracingNotifier, TransitionAssignmentRequest, TransitionAssignmentResponse,
    authenticate, create_assignment, create_slot, create_template, deactivate_template,
    expand_templates, get_assignment, get_slot, get_usage, list_assignments_for_slot,
    list_audit_events, list_slots, list_sub_slots, record_leave, release_slot, reserve_sub_slot,
    reset_monthly_usage, run_expiry_sweep, set_subscription, sweep_expired_assignments,
    transition_assignment,
};
use consult_sched_audit::Cause;
use consult_sched_persistence::SqlitePersistence;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Consultation scheduling server - HTTP surface for the availability and assignment engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the `SQLite` database file. If not provided, uses in-memory database.
    #[arg(short, long)]
    database: Option<String>,

    /// Port to bind the server to
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// IANA timezone slot dates and times are interpreted in
    #[arg(long, default_value = "UTC")]
    timezone: String,

    /// Hours a doctor has to answer a routine request (0 disables expiry)
    #[arg(long, default_value_t = 24)]
    routine_window_hours: u32,

    /// Hours a doctor has to answer an urgent request (0 disables expiry)
    #[arg(long, default_value_t = 6)]
    urgent_window_hours: u32,

    /// Hours a doctor has to answer an emergency request (0 disables expiry)
    #[arg(long, default_value_t = 1)]
    emergency_window_hours: u32,

    /// Monthly assignment limit for doctors without an active plan
    #[arg(long, default_value_t = 5)]
    default_doctor_limit: i32,

    /// Monthly assignment limit for hospitals without an active plan
    #[arg(long, default_value_t = 20)]
    default_hospital_limit: i32,

    /// Minimum notice in hours for a participant to cancel
    #[arg(long, default_value_t = 24)]
    cancellation_notice_hours: u32,

    /// Seconds between background expiry sweeps (0 disables the sweeper)
    #[arg(long, default_value_t = 300)]
    sweep_interval_secs: u64,
}

fn response_window(hours: u32) -> Option<Duration> {
    if hours == 0 {
        None
    } else {
        Some(Duration::hours(i64::from(hours)))
    }
}

/// Builds the engine configuration from command-line arguments.
fn engine_config(args: &Args) -> Result<EngineConfig, String> {
    let timezone: Tz = args
        .timezone
        .parse()
        .map_err(|e| format!("Invalid timezone '{}': {e}", args.timezone))?;

    Ok(EngineConfig {
        timezone,
        routine_window: response_window(args.routine_window_hours),
        urgent_window: response_window(args.urgent_window_hours),
        emergency_window: response_window(args.emergency_window_hours),
        default_doctor_limit: args.default_doctor_limit,
        default_hospital_limit: args.default_hospital_limit,
        cancellation_notice_hours: args.cancellation_notice_hours,
        ..EngineConfig::default()
    })
}

/// Application state shared across handlers.
///
/// The persistence layer is wrapped in a Mutex; every operation runs
/// against the single connection it guards.
#[derive(Clone)]
struct AppState {
    /// The system of record.
    persistence: Arc<Mutex<SqlitePersistence>>,
    /// Engine defaults.
    config: Arc<EngineConfig>,
    /// Receives domain events after commit.
    notifier: Arc<dyn Notifier>,
}

/// A write request: the caller's identity and cause, plus the operation's body.
#[derive(Debug, Clone, Deserialize)]
struct ApiRequest<T> {
    /// The actor ID performing this action.
    actor_id: i64,
    /// The role of the actor.
    actor_role: String,
    /// The cause ID for this action.
    cause_id: String,
    /// The cause description.
    cause_description: String,
    #[serde(flatten)]
    body: T,
}

impl<T> ApiRequest<T> {
    fn caller(&self) -> Result<(AuthenticatedActor, Cause), HttpError> {
        let actor: AuthenticatedActor = authenticate_caller(self.actor_id, &self.actor_role)?;
        let cause: Cause = Cause::new(self.cause_id.clone(), self.cause_description.clone());
        Ok((actor, cause))
    }
}

/// Body of requests that carry nothing beyond identity.
#[derive(Debug, Clone, Default, Deserialize)]
struct NoBody {}

/// Identity for read requests, carried in the query string.
#[derive(Debug, Deserialize)]
struct IdentityQuery {
    /// The actor ID.
    actor_id: i64,
    /// The role of the actor.
    actor_role: String,
}

/// Query parameters for listing a doctor's slots on a date.
#[derive(Debug, Deserialize)]
struct SlotListQuery {
    actor_id: i64,
    actor_role: String,
    /// `YYYY-MM-DD`.
    date: String,
}

/// Query parameters for reading usage.
#[derive(Debug, Deserialize)]
struct UsageQuery {
    actor_id: i64,
    actor_role: String,
    /// `YYYY-MM`; defaults to the current month.
    month: Option<String>,
}

/// Error response type.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorResponse {
    /// Error indicator.
    error: bool,
    /// The failure category.
    kind: String,
    /// Error message.
    message: String,
}

/// HTTP error wrapper that implements `IntoResponse`.
#[derive(Debug)]
struct HttpError {
    /// The HTTP status code.
    status: StatusCode,
    /// The failure category.
    kind: &'static str,
    /// The error message.
    message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body: Json<ErrorResponse> = Json(ErrorResponse {
            error: true,
            kind: self.kind.to_string(),
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let status: StatusCode = match err {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::InvalidRange { .. } | ApiError::InvalidInput { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::SlotConflict { .. }
            | ApiError::InvalidTransition { .. }
            | ApiError::AlreadyFinal { .. } => StatusCode::CONFLICT,
            ApiError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Expired { .. } => StatusCode::GONE,
            ApiError::CancellationWindowClosed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            ApiError::Internal { .. } => {
                error!(error = %err, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

fn authenticate_caller(actor_id: i64, actor_role: &str) -> Result<AuthenticatedActor, HttpError> {
    authenticate(actor_id, actor_role).map_err(|e| HttpError::from(ApiError::from(e)))
}

// ============================================================================
// Slots
// ============================================================================

/// Handler for POST `/slots` endpoint.
async fn handle_create_slot(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<ApiRequest<CreateSlotRequest>>,
) -> Result<Json<SlotResponse>, HttpError> {
    info!(
        actor_id = req.actor_id,
        role = %req.actor_role,
        doctor_id = req.body.doctor_id,
        slot_date = %req.body.slot_date,
        "Handling create_slot request"
    );
    let (actor, cause) = req.caller()?;

    let mut persistence = app_state.persistence.lock().await;
    let slot: SlotResponse = create_slot(
        &mut persistence,
        &req.body,
        &actor,
        &cause,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(slot))
}

/// Handler for GET `/slots/{slot_id}` endpoint.
async fn handle_get_slot(
    AxumState(app_state): AxumState<AppState>,
    Path(slot_id): Path<i64>,
    Query(query): Query<IdentityQuery>,
) -> Result<Json<SlotResponse>, HttpError> {
    debug!(slot_id, "Handling get_slot request");
    authenticate_caller(query.actor_id, &query.actor_role)?;

    let mut persistence = app_state.persistence.lock().await;
    let slot: SlotResponse = get_slot(&mut persistence, slot_id)?;
    drop(persistence);

    Ok(Json(slot))
}

/// Handler for GET `/doctors/{doctor_id}/slots` endpoint.
async fn handle_list_slots(
    AxumState(app_state): AxumState<AppState>,
    Path(doctor_id): Path<i64>,
    Query(query): Query<SlotListQuery>,
) -> Result<Json<Vec<SlotResponse>>, HttpError> {
    debug!(doctor_id, date = %query.date, "Handling list_slots request");
    authenticate_caller(query.actor_id, &query.actor_role)?;

    let mut persistence = app_state.persistence.lock().await;
    let slots: Vec<SlotResponse> = list_slots(&mut persistence, doctor_id, &query.date)?;
    drop(persistence);

    Ok(Json(slots))
}

/// Handler for GET `/slots/{slot_id}/sub_slots` endpoint.
async fn handle_list_sub_slots(
    AxumState(app_state): AxumState<AppState>,
    Path(slot_id): Path<i64>,
    Query(query): Query<IdentityQuery>,
) -> Result<Json<Vec<SubSlotResponse>>, HttpError> {
    debug!(slot_id, "Handling list_sub_slots request");
    authenticate_caller(query.actor_id, &query.actor_role)?;

    let mut persistence = app_state.persistence.lock().await;
    let sub_slots: Vec<SubSlotResponse> = list_sub_slots(&mut persistence, slot_id)?;
    drop(persistence);

    Ok(Json(sub_slots))
}

/// Handler for POST `/slots/{slot_id}/sub_slots` endpoint.
async fn handle_reserve_sub_slot(
    AxumState(app_state): AxumState<AppState>,
    Path(slot_id): Path<i64>,
    Json(req): Json<ApiRequest<ReserveSubSlotRequest>>,
) -> Result<Json<SlotResponse>, HttpError> {
    info!(
        actor_id = req.actor_id,
        role = %req.actor_role,
        parent_slot_id = slot_id,
        "Handling reserve_sub_slot request"
    );
    let (actor, cause) = req.caller()?;

    let mut persistence = app_state.persistence.lock().await;
    let sub_slot: SlotResponse = reserve_sub_slot(
        &mut persistence,
        slot_id,
        &req.body,
        &actor,
        &cause,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(sub_slot))
}

/// Handler for POST `/slots/{slot_id}/release` endpoint.
async fn handle_release_slot(
    AxumState(app_state): AxumState<AppState>,
    Path(slot_id): Path<i64>,
    Json(req): Json<ApiRequest<NoBody>>,
) -> Result<Json<SlotResponse>, HttpError> {
    info!(
        actor_id = req.actor_id,
        role = %req.actor_role,
        slot_id,
        "Handling release_slot request"
    );
    let (actor, cause) = req.caller()?;

    let mut persistence = app_state.persistence.lock().await;
    let slot: SlotResponse = release_slot(
        &mut persistence,
        slot_id,
        &actor,
        &cause,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(slot))
}

/// Handler for GET `/slots/{slot_id}/assignments` endpoint.
async fn handle_list_slot_assignments(
    AxumState(app_state): AxumState<AppState>,
    Path(slot_id): Path<i64>,
    Query(query): Query<IdentityQuery>,
) -> Result<Json<Vec<AssignmentResponse>>, HttpError> {
    debug!(slot_id, "Handling list_assignments_for_slot request");
    let actor: AuthenticatedActor = authenticate_caller(query.actor_id, &query.actor_role)?;

    let mut persistence = app_state.persistence.lock().await;
    let assignments: Vec<AssignmentResponse> = list_assignments_for_slot(
        &mut persistence,
        &app_state.config,
        slot_id,
        &actor,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(assignments))
}

// ============================================================================
// Templates and leaves
// ============================================================================

/// Handler for POST `/templates` endpoint.
async fn handle_create_template(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<ApiRequest<CreateTemplateRequest>>,
) -> Result<Json<TemplateResponse>, HttpError> {
    info!(
        actor_id = req.actor_id,
        role = %req.actor_role,
        doctor_id = req.body.doctor_id,
        template_name = %req.body.template_name,
        "Handling create_template request"
    );
    let (actor, cause) = req.caller()?;

    let mut persistence = app_state.persistence.lock().await;
    let template: TemplateResponse = create_template(
        &mut persistence,
        &req.body,
        &actor,
        &cause,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(template))
}

/// Handler for POST `/templates/{template_id}/deactivate` endpoint.
async fn handle_deactivate_template(
    AxumState(app_state): AxumState<AppState>,
    Path(template_id): Path<i64>,
    Json(req): Json<ApiRequest<NoBody>>,
) -> Result<Json<TemplateResponse>, HttpError> {
    info!(
        actor_id = req.actor_id,
        role = %req.actor_role,
        template_id,
        "Handling deactivate_template request"
    );
    let (actor, cause) = req.caller()?;

    let mut persistence = app_state.persistence.lock().await;
    let template: TemplateResponse = deactivate_template(
        &mut persistence,
        template_id,
        &actor,
        &cause,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(template))
}

/// Handler for POST `/templates/expand` endpoint.
async fn handle_expand_templates(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<ApiRequest<ExpandTemplatesRequest>>,
) -> Result<Json<ExpansionSummary>, HttpError> {
    info!(
        actor_id = req.actor_id,
        role = %req.actor_role,
        "Handling expand_templates request"
    );
    let (actor, cause) = req.caller()?;

    let mut persistence = app_state.persistence.lock().await;
    let summary: ExpansionSummary = expand_templates(
        &mut persistence,
        &app_state.config,
        &req.body,
        &actor,
        &cause,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(summary))
}

/// Handler for POST `/leaves` endpoint.
async fn handle_record_leave(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<ApiRequest<RecordLeaveRequest>>,
) -> Result<Json<LeaveResponse>, HttpError> {
    info!(
        actor_id = req.actor_id,
        role = %req.actor_role,
        doctor_id = req.body.doctor_id,
        "Handling record_leave request"
    );
    let (actor, cause) = req.caller()?;

    let mut persistence = app_state.persistence.lock().await;
    let leave: LeaveResponse = record_leave(
        &mut persistence,
        &req.body,
        &actor,
        &cause,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(leave))
}

// ============================================================================
// Assignments
// ============================================================================

/// Handler for POST `/assignments` endpoint.
async fn handle_create_assignment(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<ApiRequest<CreateAssignmentRequest>>,
) -> Result<Json<CreateAssignmentResponse>, HttpError> {
    info!(
        actor_id = req.actor_id,
        role = %req.actor_role,
        doctor_id = req.body.doctor_id,
        "Handling create_assignment request"
    );
    let (actor, cause) = req.caller()?;

    let mut persistence = app_state.persistence.lock().await;
    let created: CreateAssignmentResponse = create_assignment(
        &mut persistence,
        &app_state.config,
        app_state.notifier.as_ref(),
        &req.body,
        &actor,
        &cause,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(created))
}

/// Handler for GET `/assignments/{assignment_id}` endpoint.
async fn handle_get_assignment(
    AxumState(app_state): AxumState<AppState>,
    Path(assignment_id): Path<i64>,
    Query(query): Query<IdentityQuery>,
) -> Result<Json<AssignmentResponse>, HttpError> {
    debug!(assignment_id, "Handling get_assignment request");
    let actor: AuthenticatedActor = authenticate_caller(query.actor_id, &query.actor_role)?;

    let mut persistence = app_state.persistence.lock().await;
    let assignment: AssignmentResponse = get_assignment(
        &mut persistence,
        &app_state.config,
        assignment_id,
        &actor,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(assignment))
}

/// Handler for POST `/assignments/{assignment_id}/status` endpoint.
async fn handle_transition_assignment(
    AxumState(app_state): AxumState<AppState>,
    Path(assignment_id): Path<i64>,
    Json(req): Json<ApiRequest<TransitionAssignmentRequest>>,
) -> Result<Json<TransitionAssignmentResponse>, HttpError> {
    info!(
        actor_id = req.actor_id,
        role = %req.actor_role,
        assignment_id,
        status = %req.body.status,
        "Handling transition_assignment request"
    );
    let (actor, cause) = req.caller()?;

    let mut persistence = app_state.persistence.lock().await;
    let transitioned: TransitionAssignmentResponse = transition_assignment(
        &mut persistence,
        &app_state.config,
        app_state.notifier.as_ref(),
        assignment_id,
        &req.body,
        &actor,
        &cause,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(transitioned))
}

/// Handler for POST `/sweeps/expiry` endpoint.
async fn handle_run_expiry_sweep(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<ApiRequest<NoBody>>,
) -> Result<Json<SweepResponse>, HttpError> {
    info!(
        actor_id = req.actor_id,
        role = %req.actor_role,
        "Handling run_expiry_sweep request"
    );
    let (actor, _cause) = req.caller()?;

    let mut persistence = app_state.persistence.lock().await;
    let swept: SweepResponse = run_expiry_sweep(
        &mut persistence,
        &app_state.config,
        app_state.notifier.as_ref(),
        &actor,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(swept))
}

// ============================================================================
// Usage, subscriptions, and audit
// ============================================================================

/// Handler for GET `/usage/{actor_kind}/{actor_id}` endpoint.
async fn handle_get_usage(
    AxumState(app_state): AxumState<AppState>,
    Path((actor_kind, actor_id)): Path<(String, i64)>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<UsageStatus>, HttpError> {
    debug!(actor_kind = %actor_kind, actor_id, "Handling get_usage request");
    let actor: AuthenticatedActor = authenticate_caller(query.actor_id, &query.actor_role)?;

    let mut persistence = app_state.persistence.lock().await;
    let usage: UsageStatus = get_usage(
        &mut persistence,
        &app_state.config,
        &actor_kind,
        actor_id,
        query.month.as_deref(),
        &actor,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(usage))
}

/// Handler for POST `/usage/reset` endpoint.
async fn handle_reset_usage(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<ApiRequest<ResetUsageRequest>>,
) -> Result<Json<MonthlyResetSummary>, HttpError> {
    info!(
        actor_id = req.actor_id,
        role = %req.actor_role,
        month = ?req.body.month,
        "Handling reset_monthly_usage request"
    );
    let (actor, cause) = req.caller()?;

    let mut persistence = app_state.persistence.lock().await;
    let summary: MonthlyResetSummary = reset_monthly_usage(
        &mut persistence,
        &app_state.config,
        &req.body,
        &actor,
        &cause,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(summary))
}

/// Handler for POST `/subscriptions` endpoint.
async fn handle_set_subscription(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<ApiRequest<SetSubscriptionRequest>>,
) -> Result<Json<SubscriptionResponse>, HttpError> {
    info!(
        actor_id = req.actor_id,
        role = %req.actor_role,
        subscriber_id = req.body.subscriber_id,
        tier = %req.body.tier,
        "Handling set_subscription request"
    );
    let (actor, cause) = req.caller()?;

    let mut persistence = app_state.persistence.lock().await;
    let subscription: SubscriptionResponse = set_subscription(
        &mut persistence,
        &app_state.config,
        &req.body,
        &actor,
        &cause,
        OffsetDateTime::now_utc(),
    )?;
    drop(persistence);

    Ok(Json(subscription))
}

/// Handler for GET `/audit/{entity_type}/{entity_id}` endpoint.
async fn handle_list_audit_events(
    AxumState(app_state): AxumState<AppState>,
    Path((entity_type, entity_id)): Path<(String, i64)>,
    Query(query): Query<IdentityQuery>,
) -> Result<Json<Vec<AuditEventResponse>>, HttpError> {
    debug!(entity_type = %entity_type, entity_id, "Handling list_audit_events request");
    let actor: AuthenticatedActor = authenticate_caller(query.actor_id, &query.actor_role)?;

    let mut persistence = app_state.persistence.lock().await;
    let events: Vec<AuditEventResponse> =
        list_audit_events(&mut persistence, &entity_type, entity_id, &actor)?;
    drop(persistence);

    Ok(Json(events))
}

/// Builds the application router with all endpoints.
fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/slots", post(handle_create_slot))
        .route("/slots/{slot_id}", get(handle_get_slot))
        .route(
            "/slots/{slot_id}/sub_slots",
            get(handle_list_sub_slots).post(handle_reserve_sub_slot),
        )
        .route("/slots/{slot_id}/release", post(handle_release_slot))
        .route(
            "/slots/{slot_id}/assignments",
            get(handle_list_slot_assignments),
        )
        .route("/doctors/{doctor_id}/slots", get(handle_list_slots))
        .route("/templates", post(handle_create_template))
        .route(
            "/templates/{template_id}/deactivate",
            post(handle_deactivate_template),
        )
        .route("/templates/expand", post(handle_expand_templates))
        .route("/leaves", post(handle_record_leave))
        .route("/assignments", post(handle_create_assignment))
        .route("/assignments/{assignment_id}", get(handle_get_assignment))
        .route(
            "/assignments/{assignment_id}/status",
            post(handle_transition_assignment),
        )
        .route("/sweeps/expiry", post(handle_run_expiry_sweep))
        .route("/usage/reset", post(handle_reset_usage))
        .route("/usage/{actor_kind}/{actor_id}", get(handle_get_usage))
        .route("/subscriptions", post(handle_set_subscription))
        .route(
            "/audit/{entity_type}/{entity_id}",
            get(handle_list_audit_events),
        )
        .with_state(app_state)
}

/// Runs one expiry sweep as the system.
async fn sweep_once(app_state: &AppState) {
    let mut persistence = app_state.persistence.lock().await;
    match sweep_expired_assignments(
        &mut persistence,
        &app_state.config,
        app_state.notifier.as_ref(),
        OffsetDateTime::now_utc(),
    ) {
        Ok(swept) if swept.found > 0 => info!(
            found = swept.found,
            cancelled = swept.cancelled,
            released = swept.released,
            "Background expiry sweep complete"
        ),
        Ok(_) => debug!("Background expiry sweep found nothing to expire"),
        Err(e) => warn!(error = %e, "Background expiry sweep failed"),
    }
}

/// Sweeps for expired assignments every `period` until the process exits.
async fn run_expiry_sweeper(app_state: AppState, period: std::time::Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        sweep_once(&app_state).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args: Args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Initializing consultation scheduling server");

    let config: EngineConfig = engine_config(&args)?;
    info!(timezone = %config.timezone, "Engine configured");

    // Initialize persistence (in-memory or file-based based on CLI argument)
    let persistence: SqlitePersistence = if let Some(db_path) = &args.database {
        info!("Using file-based database at: {}", db_path);
        SqlitePersistence::new_with_file(db_path)?
    } else {
        info!("Using in-memory database");
        SqlitePersistence::new_in_memory()?
    };

    let app_state: AppState = AppState {
        persistence: Arc::new(Mutex::new(persistence)),
        config: Arc::new(config),
        notifier: Arc::new(TracingNotifier),
    };

    if args.sweep_interval_secs > 0 {
        info!(
            interval_secs = args.sweep_interval_secs,
            "Starting background expiry sweeper"
        );
        tokio::spawn(run_expiry_sweeper(
            app_state.clone(),
            std::time::Duration::from_secs(args.sweep_interval_secs),
        ));
    } else {
        info!("Background expiry sweeper disabled");
    }

    // Build router
    let app: Router = build_router(app_state);

    // Bind to address
    let addr: std::net::SocketAddr = format!("127.0.0.1:{}", args.port).parse()?;
    info!("Server listening on {}", addr);

    // Run server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests;
