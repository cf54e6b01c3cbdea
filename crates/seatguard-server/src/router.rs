//! Axum router wiring.
//!
//! Client routes (`/v1/verify-license`, `/v1/heartbeat`), admin events under
//! `/v1/admin/*`, and the health and metrics routes, all behind the CORS layer.

use axum::{
    routing::{get, post},
    Router,
};

use crate::{
    app_state::AppState,
    ops,
    transport::{cors, http},
};

pub fn build_router(state: AppState) -> Router {
    let cors = cors::build_cors_layer(&state.cfg().server.cors_origins);
    Router::new()
        .route("/v1/verify-license", post(http::verify_license))
        .route("/v1/heartbeat", post(http::heartbeat))
        .route("/v1/admin/issue", post(http::admin_issue))
        .route("/v1/admin/activate", post(http::admin_activate))
        .route("/v1/admin/ban", post(http::admin_ban))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .layer(cors)
        .with_state(state)
}
