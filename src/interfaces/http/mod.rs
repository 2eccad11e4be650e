pub mod handlers;
pub mod state;

use crate::error::RelayError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use self::state::AppState;
use serde_json::json;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/instructions", post(handlers::create_instruction))
        .route("/instructions/:id/status", get(handlers::instruction_status))
        .route("/instructions/:id/resend", post(handlers::resend_instruction))
        .route(
            "/instructions/:id/update-handle",
            post(handlers::update_handle),
        )
        .route("/ops/health", get(handlers::health))
        .route("/ops/mailbox/events", post(handlers::ingest_mailbox_event))
        .route("/ops/jobs/claim", post(handlers::claim_job))
        .route("/ops/jobs/:id/complete", post(handlers::complete_job))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Maps the error taxonomy onto client-visible responses. Denials carry
/// machine-readable reasons; transient failures are marked retriable;
/// nothing leaks partial state.
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            RelayError::DeniedByRisk { score, reasons } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "denied_by_risk",
                    "reasons": reasons,
                    "risk_score": score,
                }),
            ),
            RelayError::NoCapacityAvailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "no_capacity_available", "retriable": true }),
            ),
            RelayError::EnqueueFailure(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "enqueue_failure", "retriable": true }),
            ),
            RelayError::MaxResendsExceeded(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "max_resends_exceeded" }),
            ),
            RelayError::NotFound(_) => {
                (StatusCode::NOT_FOUND, json!({ "error": "not_found" }))
            }
            RelayError::StaleTransition { .. } => {
                (StatusCode::CONFLICT, json!({ "error": "stale_transition" }))
            }
            RelayError::IllegalTransition { .. } => (
                StatusCode::CONFLICT,
                json!({ "error": "illegal_transition" }),
            ),
            _ => {
                tracing::error!(error = %self, "internal error on http path");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
