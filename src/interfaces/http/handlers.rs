use super::state::AppState;
use crate::application::admission::AdmissionRequest;
use crate::domain::notification::{InboundNotification, StatusHint};
use crate::error::RelayError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

/// `POST /instructions`: admit an order into a payment instruction.
pub async fn create_instruction(
    State(state): State<AppState>,
    Json(payload): Json<AdmissionRequest>,
) -> Result<impl IntoResponse, RelayError> {
    let outcome = state.admission.admit(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "instruction_id": outcome.instruction_id,
            "instruction_code": outcome.instruction_code,
            "status": outcome.status,
        })),
    ))
}

/// `GET /instructions/:id/status`
pub async fn instruction_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, RelayError> {
    let instruction = state
        .instructions
        .get(&id)
        .await?
        .ok_or(RelayError::NotFound(id))?;
    Ok(Json(json!({ "status": instruction.status })))
}

/// `POST /instructions/:id/resend`
pub async fn resend_instruction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, RelayError> {
    let updated = state.retry.resend(&id).await?;
    Ok(Json(json!({ "resend_count": updated.resend_count })))
}

#[derive(Deserialize)]
pub struct UpdateHandleBody {
    pub payer_handle: String,
}

/// `POST /instructions/:id/update-handle`
pub async fn update_handle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateHandleBody>,
) -> Result<impl IntoResponse, RelayError> {
    let updated = state.retry.update_handle(&id, &body.payer_handle).await?;
    Ok(Json(json!({ "payer_handle": updated.payer_handle })))
}

/// `GET /ops/health`
pub async fn health(State(state): State<AppState>) -> Result<impl IntoResponse, RelayError> {
    let queue_depth = state.queue.depth().await?;
    let active_alias_count = state.aliases.active_count().await?;
    let mailbox_heartbeat = state
        .heartbeat
        .last_seen()
        .await
        .map(|at| at.to_rfc3339());
    Ok(Json(json!({
        "queue_depth": queue_depth,
        "mailbox_heartbeat": mailbox_heartbeat,
        "active_alias_count": active_alias_count,
        "timestamp": Utc::now().to_rfc3339(),
    })))
}

/// Parsed mailbox event pushed by the external watcher.
#[derive(Deserialize)]
pub struct MailboxEventBody {
    pub status_hint: String,
    pub amount_cents: i64,
    pub text: String,
    pub order_reference: Option<String>,
    pub source_uid: String,
}

/// `POST /ops/mailbox/events`
pub async fn ingest_mailbox_event(
    State(state): State<AppState>,
    Json(body): Json<MailboxEventBody>,
) -> Result<impl IntoResponse, RelayError> {
    let notification = InboundNotification {
        status_hint: StatusHint::parse(&body.status_hint),
        amount_cents: body.amount_cents,
        order_reference: body.order_reference,
        raw_text: body.text,
        source_uid: body.source_uid,
    };
    let outcome = state.matcher.handle(notification).await?;
    Ok(Json(outcome))
}

/// `POST /ops/jobs/claim`: the bank automation worker pulls its next job.
pub async fn claim_job(State(state): State<AppState>) -> Result<impl IntoResponse, RelayError> {
    match state.outbound.next_job().await? {
        Some(job) => Ok(Json(job).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// Worker-reported outcome of one bank submission attempt.
#[derive(Deserialize)]
pub struct CompleteJobBody {
    pub ok: bool,
    pub request_ref: Option<String>,
    pub error: Option<String>,
}

/// `POST /ops/jobs/:id/complete`, where `:id` is the instruction id carried
/// in the job snapshot.
pub async fn complete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CompleteJobBody>,
) -> Result<impl IntoResponse, RelayError> {
    if body.ok {
        let Some(request_ref) = body.request_ref else {
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "request_ref required on success" })),
            )
                .into_response());
        };
        let updated = state.outbound.complete_submission(&id, &request_ref).await?;
        Ok(Json(json!({ "status": updated.status })).into_response())
    } else {
        let reason = body.error.unwrap_or_else(|| "unspecified".to_string());
        let instruction = state.outbound.fail_submission(&id, &reason).await?;
        Ok(Json(json!({ "status": instruction.status, "requeued": true })).into_response())
    }
}
