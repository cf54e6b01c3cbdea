//! JSON handlers for verify, heartbeat and the admin events.
//!
//! Responsibilities:
//! - Parse bodies (malformed JSON becomes a structured `BAD_REQUEST`)
//! - Call into the `LicenseGate` with the current time
//! - Map outcomes to status codes + bodies, record metrics, log
//!
//! Verify and heartbeat always answer with their own result shape, even on
//! failure, so clients only ever branch on `valid` / `ok`.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

use seatguard_core::error::SeatError;
use seatguard_core::protocol::{
    ActivationEvent, BanCommand, HeartbeatRequest, HeartbeatResponse, IssueCommand, VerifyRequest, VerifyResponse,
};
use seatguard_core::LicenseRecord;

use crate::app_state::AppState;

/// Error wrapper for handlers that answer with a generic error body.
#[derive(Debug)]
pub struct ApiError(pub SeatError);

impl From<SeatError> for ApiError {
    fn from(e: SeatError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.0.client_code().as_str(),
            "message": self.0.to_string(),
        }));
        (status_for(&self.0), body).into_response()
    }
}

pub fn status_for(err: &SeatError) -> StatusCode {
    match err {
        SeatError::BadRequest(_) => StatusCode::BAD_REQUEST,
        SeatError::KeyNotFound | SeatError::InvalidSession | SeatError::Unauthorized => StatusCode::UNAUTHORIZED,
        SeatError::NotActivated | SeatError::Expired(_) | SeatError::CapacityExceeded => StatusCode::FORBIDDEN,
        SeatError::StorageFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        SeatError::MalformedState(_) | SeatError::UnsupportedVersion | SeatError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, SeatError> {
    body.map(|Json(v)| v)
        .map_err(|e| SeatError::BadRequest(format!("invalid JSON request: {}", e.body_text())))
}

// --------------------
// Verify
// --------------------
pub async fn verify_license(
    State(app): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let resp = verify_inner(&app, body).await;
    app.metrics().verify_duration.observe(&[], started.elapsed());
    resp
}

async fn verify_inner(app: &AppState, body: Result<Json<VerifyRequest>, JsonRejection>) -> Response {
    let key = match json_body(body).and_then(|req| req.license_key().map(str::to_owned)) {
        Ok(k) => k,
        Err(e) => return verify_denied(app, "-", &e),
    };

    match app.gate().verify(&key, Utc::now()).await {
        Ok(v) => {
            let m = app.metrics();
            m.verify_outcomes.inc(&[("outcome", "granted")]);
            if !v.admission.evicted.is_empty() {
                m.evictions.add(&[], v.admission.evicted.len() as u64);
            }
            tracing::info!(
                key = %key,
                active = v.admission.active_count,
                max = v.admission.max_sessions,
                evicted = v.admission.evicted.len(),
                "license verified"
            );
            let body = VerifyResponse::granted(
                v.admission.session.token,
                v.license.expires_on,
                v.admission.active_count,
                v.admission.max_sessions,
            );
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => verify_denied(app, &key, &e),
    }
}

fn verify_denied(app: &AppState, key: &str, err: &SeatError) -> Response {
    let code = err.client_code().as_str();
    app.metrics().verify_outcomes.inc(&[("outcome", code)]);
    if err.is_validation() {
        tracing::info!(key = %key, reason = code, "verification denied");
    } else {
        tracing::warn!(key = %key, reason = code, error = %err, "verification failed");
    }
    (status_for(err), Json(VerifyResponse::denied(err))).into_response()
}

// --------------------
// Heartbeat
// --------------------
pub async fn heartbeat(
    State(app): State<AppState>,
    body: Result<Json<HeartbeatRequest>, JsonRejection>,
) -> Response {
    let result = match json_body(body).and_then(|req| req.validate().map(|_| req)) {
        Ok(req) => app
            .gate()
            .heartbeat(&req.license_key, &req.session_token, Utc::now())
            .await
            .map(|_| ()),
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            app.metrics().heartbeat_outcomes.inc(&[("outcome", "ok")]);
            (StatusCode::OK, Json(HeartbeatResponse::ok())).into_response()
        }
        Err(e) => {
            let code = e.client_code().as_str();
            app.metrics().heartbeat_outcomes.inc(&[("outcome", code)]);
            if !e.is_validation() {
                tracing::warn!(reason = code, error = %e, "heartbeat failed");
            }
            (status_for(&e), Json(HeartbeatResponse::invalid(&e))).into_response()
        }
    }
}

// --------------------
// Admin
// --------------------
fn authorize(app: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = app.cfg().server.admin_token.as_deref() else {
        return Err(StatusCode::NOT_FOUND.into_response());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented == Some(expected) {
        Ok(())
    } else {
        Err(ApiError(SeatError::Unauthorized).into_response())
    }
}

pub async fn admin_issue(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<IssueCommand>, JsonRejection>,
) -> Result<Json<LicenseRecord>, Response> {
    authorize(&app, &headers)?;
    let cmd = json_body(body).map_err(|e| ApiError(e).into_response())?;
    app.gate()
        .issue(&cmd.key, &cmd.tier, cmd.max_sessions, Utc::now().date_naive())
        .map(Json)
        .map_err(|e| ApiError(e).into_response())
}

pub async fn admin_activate(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ActivationEvent>, JsonRejection>,
) -> Result<Json<LicenseRecord>, Response> {
    authorize(&app, &headers)?;
    let ev = json_body(body).map_err(|e| ApiError(e).into_response())?;
    app.gate()
        .activate(&ev, Utc::now().date_naive())
        .map(Json)
        .map_err(|e| ApiError(e).into_response())
}

pub async fn admin_ban(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<BanCommand>, JsonRejection>,
) -> Result<Json<LicenseRecord>, Response> {
    authorize(&app, &headers)?;
    let cmd = json_body(body).map_err(|e| ApiError(e).into_response())?;
    app.gate()
        .ban(&cmd.key, Utc::now().date_naive())
        .await
        .map(Json)
        .map_err(|e| ApiError(e).into_response())
}
