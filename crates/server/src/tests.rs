// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode as HttpStatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

const DOCTOR: i64 = 7;
const HOSPITAL: i64 = 3;
const ADMIN: i64 = 1;

/// Helper to create test app state with in-memory persistence.
fn create_test_app_state() -> AppState {
    app_state_with(EngineConfig::default())
}

fn app_state_with(config: EngineConfig) -> AppState {
    let persistence: SqlitePersistence =
        SqlitePersistence::new_in_memory().expect("Failed to create in-memory persistence");
    AppState {
        persistence: Arc::new(Mutex::new(persistence)),
        config: Arc::new(config),
        notifier: Arc::new(TracingNotifier),
    }
}

/// Wraps operation fields in the identity envelope of a write request.
fn envelope(actor_id: i64, actor_role: &str, body: Value) -> Value {
    let mut request: Value = json!({
        "actor_id": actor_id,
        "actor_role": actor_role,
        "cause_id": "test-cause",
        "cause_description": "Test request",
    });
    if let (Some(target), Value::Object(fields)) = (request.as_object_mut(), body) {
        target.extend(fields);
    }
    request
}

async fn post_json(app: &Router, uri: &str, body: &Value) -> (HttpStatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    read(response).await
}

async fn get_json(app: &Router, uri: &str) -> (HttpStatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read(response).await
}

async fn read(response: Response) -> (HttpStatusCode, Value) {
    let status: HttpStatusCode = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (
        status,
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null),
    )
}

async fn create_parent_slot(app: &Router) -> i64 {
    let (status, body) = post_json(
        app,
        "/slots",
        &envelope(
            DOCTOR,
            "doctor",
            json!({
                "doctor_id": DOCTOR,
                "slot_date": "2099-03-16",
                "start_time": "09:00",
                "end_time": "12:00",
            }),
        ),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    body["slotId"].as_i64().unwrap()
}

async fn request_sub_slot(
    app: &Router,
    parent_slot_id: i64,
    start: &str,
    end: &str,
) -> (HttpStatusCode, Value) {
    post_json(
        app,
        "/assignments",
        &envelope(
            HOSPITAL,
            "hospital",
            json!({
                "doctor_id": DOCTOR,
                "patient_id": 42,
                "parent_slot_id": parent_slot_id,
                "start_time": start,
                "end_time": end,
                "consultation_fee_cents": 15000,
            }),
        ),
    )
    .await
}

#[tokio::test]
async fn test_doctor_creates_slot() {
    let app: Router = build_router(create_test_app_state());
    let slot_id: i64 = create_parent_slot(&app).await;

    let (status, body) = get_json(
        &app,
        &format!("/slots/{slot_id}?actor_id={HOSPITAL}&actor_role=hospital"),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["status"], "available");
    assert_eq!(body["startTime"], "09:00:00");
    assert_eq!(body["isManual"], true);

    let (status, body) = get_json(
        &app,
        &format!("/doctors/{DOCTOR}/slots?actor_id={DOCTOR}&actor_role=doctor&date=2099-03-16"),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_hospital_cannot_create_slot() {
    let app: Router = build_router(create_test_app_state());
    let (status, body) = post_json(
        &app,
        "/slots",
        &envelope(
            HOSPITAL,
            "hospital",
            json!({
                "doctor_id": DOCTOR,
                "slot_date": "2099-03-16",
                "start_time": "09:00",
                "end_time": "12:00",
            }),
        ),
    )
    .await;

    assert_eq!(status, HttpStatusCode::FORBIDDEN);
    assert_eq!(body["error"], true);
    assert_eq!(body["kind"], "Unauthorized");
}

#[tokio::test]
async fn test_unknown_role_is_unauthenticated() {
    let app: Router = build_router(create_test_app_state());
    let (status, body) = get_json(&app, "/slots/1?actor_id=5&actor_role=nurse").await;
    assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "AuthenticationFailed");
}

#[tokio::test]
async fn test_missing_slot_is_not_found() {
    let app: Router = build_router(create_test_app_state());
    let (status, body) = get_json(&app, "/slots/999?actor_id=1&actor_role=admin").await;
    assert_eq!(status, HttpStatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");
}

#[tokio::test]
async fn test_inverted_range_is_bad_request() {
    let app: Router = build_router(create_test_app_state());
    let (status, body) = post_json(
        &app,
        "/slots",
        &envelope(
            DOCTOR,
            "doctor",
            json!({
                "doctor_id": DOCTOR,
                "slot_date": "2099-03-16",
                "start_time": "12:00",
                "end_time": "09:00",
            }),
        ),
    )
    .await;
    assert_eq!(status, HttpStatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidRange");
}

#[tokio::test]
async fn test_overlapping_sub_slot_conflicts() {
    let app: Router = build_router(create_test_app_state());
    let parent: i64 = create_parent_slot(&app).await;

    let (status, _) = request_sub_slot(&app, parent, "09:30", "10:00").await;
    assert_eq!(status, HttpStatusCode::OK);
    let (status, body) = request_sub_slot(&app, parent, "09:45", "10:15").await;
    assert_eq!(status, HttpStatusCode::CONFLICT);
    assert_eq!(body["kind"], "SlotConflict");

    let (status, body) = get_json(
        &app,
        &format!("/slots/{parent}/sub_slots?actor_id={DOCTOR}&actor_role=doctor"),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["assignmentStatus"], "pending");
}

#[tokio::test]
async fn test_assignment_lifecycle_over_http() {
    let app: Router = build_router(create_test_app_state());
    let parent: i64 = create_parent_slot(&app).await;

    let (status, created) = request_sub_slot(&app, parent, "10:00", "10:30").await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(created["assignment"]["status"], "pending");
    assert_eq!(created["slot"]["status"], "booked");
    let assignment_id: i64 = created["assignment"]["assignmentId"].as_i64().unwrap();

    let (status, view) = get_json(
        &app,
        &format!("/assignments/{assignment_id}?actor_id={DOCTOR}&actor_role=doctor"),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(view["capabilities"]["canAccept"], true);
    assert_eq!(view["capabilities"]["canComplete"], false);

    let status_uri: String = format!("/assignments/{assignment_id}/status");
    let (status, body) = post_json(
        &app,
        &status_uri,
        &envelope(HOSPITAL, "hospital", json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "Unauthorized");

    let (status, body) = post_json(
        &app,
        &status_uri,
        &envelope(DOCTOR, "doctor", json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["previousStatus"], "pending");

    let (status, body) = post_json(
        &app,
        &status_uri,
        &envelope(
            DOCTOR,
            "doctor",
            json!({ "status": "completed", "treatment_notes": "Stable" }),
        ),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["assignment"]["status"], "completed");
    assert_eq!(body["assignment"]["payment"]["doctorPayoutCents"], 15000);

    let (status, body) = post_json(
        &app,
        &status_uri,
        &envelope(DOCTOR, "doctor", json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::CONFLICT);
    assert_eq!(body["kind"], "AlreadyFinal");

    let (status, trail) = get_json(
        &app,
        &format!("/audit/assignment/{assignment_id}?actor_id={ADMIN}&actor_role=admin"),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    let actions: Vec<&str> = trail
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        actions,
        vec!["CreateAssignment", "AcceptAssignment", "CompleteAssignment"]
    );
}

#[tokio::test]
async fn test_decline_frees_the_slot() {
    let app: Router = build_router(create_test_app_state());
    let parent: i64 = create_parent_slot(&app).await;
    let (_, created) = request_sub_slot(&app, parent, "10:00", "10:30").await;
    let assignment_id: i64 = created["assignment"]["assignmentId"].as_i64().unwrap();
    let sub_slot_id: i64 = created["slot"]["slotId"].as_i64().unwrap();

    let (status, body) = post_json(
        &app,
        &format!("/assignments/{assignment_id}/status"),
        &envelope(
            DOCTOR,
            "doctor",
            json!({ "status": "declined", "reason": "On call" }),
        ),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["slotReleased"], true);

    let (_, slot) = get_json(
        &app,
        &format!("/slots/{sub_slot_id}?actor_id={DOCTOR}&actor_role=doctor"),
    )
    .await;
    assert_eq!(slot["status"], "available");

    let (status, history) = get_json(
        &app,
        &format!("/slots/{sub_slot_id}/assignments?actor_id={DOCTOR}&actor_role=doctor"),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(history[0]["status"], "declined");
}

#[tokio::test]
async fn test_late_acceptance_is_gone() {
    let config: EngineConfig = EngineConfig {
        routine_window: Some(Duration::ZERO),
        ..EngineConfig::default()
    };
    let app: Router = build_router(app_state_with(config));
    let parent: i64 = create_parent_slot(&app).await;
    let (_, created) = request_sub_slot(&app, parent, "10:00", "10:30").await;
    let assignment_id: i64 = created["assignment"]["assignmentId"].as_i64().unwrap();

    let (status, body) = post_json(
        &app,
        &format!("/assignments/{assignment_id}/status"),
        &envelope(DOCTOR, "doctor", json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::GONE);
    assert_eq!(body["kind"], "Expired");
}

#[tokio::test]
async fn test_quota_exhaustion_is_too_many_requests() {
    let app: Router = build_router(create_test_app_state());
    let (status, body) = post_json(
        &app,
        "/subscriptions",
        &envelope(
            ADMIN,
            "admin",
            json!({
                "subscriber_id": HOSPITAL,
                "subscriber_kind": "hospital",
                "tier": "basic",
                "status": "active",
                "max_assignments_per_month": 1,
            }),
        ),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["effectiveLimit"], 1);

    let parent: i64 = create_parent_slot(&app).await;
    let (status, _) = request_sub_slot(&app, parent, "09:00", "09:30").await;
    assert_eq!(status, HttpStatusCode::OK);
    let (status, body) = request_sub_slot(&app, parent, "10:00", "10:30").await;
    assert_eq!(status, HttpStatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["kind"], "QuotaExceeded");

    let (status, usage) = get_json(
        &app,
        &format!("/usage/hospital/{HOSPITAL}?actor_id={HOSPITAL}&actor_role=hospital"),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(usage["used"], 1);
    assert_eq!(usage["remaining"], 0);
}

#[tokio::test]
async fn test_expiry_sweep_requires_admin() {
    let app: Router = build_router(create_test_app_state());

    let (status, _) = post_json(&app, "/sweeps/expiry", &envelope(DOCTOR, "doctor", json!({}))).await;
    assert_eq!(status, HttpStatusCode::FORBIDDEN);

    let (status, body) = post_json(&app, "/sweeps/expiry", &envelope(ADMIN, "admin", json!({}))).await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["found"], 0);
}

#[tokio::test]
async fn test_template_expansion_and_leave() {
    let app: Router = build_router(create_test_app_state());

    let (status, template) = post_json(
        &app,
        "/templates",
        &envelope(
            DOCTOR,
            "doctor",
            json!({
                "doctor_id": DOCTOR,
                "template_name": "Morning rounds",
                "recurrence_pattern": "daily",
                "start_time": "08:00",
                "end_time": "11:00",
                "valid_from": "2099-03-01",
            }),
        ),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(template["isActive"], true);

    let (status, _) = post_json(
        &app,
        "/leaves",
        &envelope(
            DOCTOR,
            "doctor",
            json!({
                "doctor_id": DOCTOR,
                "leave_type": "personal",
                "start_date": "2099-03-03",
                "end_date": "2099-03-03",
            }),
        ),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);

    let (status, summary) = post_json(
        &app,
        "/templates/expand",
        &envelope(
            DOCTOR,
            "doctor",
            json!({ "start_date": "2099-03-02", "days": 3 }),
        ),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(summary["slotsCreated"], 2);
    assert_eq!(summary["templates"][0]["skippedLeave"], 1);

    let template_id: i64 = template["templateId"].as_i64().unwrap();
    let (status, deactivated) = post_json(
        &app,
        &format!("/templates/{template_id}/deactivate"),
        &envelope(DOCTOR, "doctor", json!({})),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(deactivated["isActive"], false);
}

#[tokio::test]
async fn test_monthly_reset_is_admin_only() {
    let app: Router = build_router(create_test_app_state());

    let (status, _) = post_json(&app, "/usage/reset", &envelope(HOSPITAL, "hospital", json!({}))).await;
    assert_eq!(status, HttpStatusCode::FORBIDDEN);

    let (status, body) = post_json(
        &app,
        "/usage/reset",
        &envelope(ADMIN, "admin", json!({ "month": "2099-03" })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["month"], "2099-03");
    assert_eq!(body["actorsReset"], 0);
}

#[test]
fn test_api_errors_map_to_status_codes() {
    let cases: Vec<(ApiError, StatusCode)> = vec![
        (
            ApiError::InvalidTransition {
                from: String::from("pending"),
                to: String::from("completed"),
                reason: String::from("not accepted"),
            },
            StatusCode::CONFLICT,
        ),
        (
            ApiError::CancellationWindowClosed { notice_hours: 24 },
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            ApiError::Internal {
                message: String::from("disk full"),
            },
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];
    for (err, expected) in cases {
        let kind: &str = err.kind();
        let http: HttpError = HttpError::from(err);
        assert_eq!(http.status, expected);
        assert_eq!(http.kind, kind);
    }
}

#[test]
fn test_engine_config_from_arguments() {
    let args: Args = Args::parse_from([
        "consult-sched-server",
        "--timezone",
        "Europe/Berlin",
        "--urgent-window-hours",
        "0",
        "--default-doctor-limit",
        "8",
    ]);
    let config: EngineConfig = engine_config(&args).unwrap();
    assert_eq!(config.timezone, chrono_tz::Europe::Berlin);
    assert_eq!(config.routine_window, Some(Duration::hours(24)));
    assert_eq!(config.urgent_window, None);
    assert_eq!(config.default_doctor_limit, 8);

    let bad: Args = Args::parse_from(["consult-sched-server", "--timezone", "Mars/Olympus"]);
    assert!(engine_config(&bad).is_err());
}
