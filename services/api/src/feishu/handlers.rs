use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use lark_ingest::connector::SyncJob;
use lark_ingest::events::handle_event;

use crate::error::ApiError;
use crate::feishu::responses::{ChallengeResponse, MessageResponse};
use crate::AppState;

async fn run_job(job: &dyn SyncJob) -> Result<Json<MessageResponse>, ApiError> {
    tracing::info!(source = job.source_name(), "sync triggered");
    match job.run().await {
        Ok(summary) => Ok(Json(MessageResponse {
            message: summary.message,
        })),
        Err(e) => {
            tracing::error!(source = job.source_name(), error = %e, "sync run failed");
            Err(e.into())
        }
    }
}

pub async fn get_new_approval_instances(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    run_job(state.instance_job.as_ref()).await
}

pub async fn update_approval_instances(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    run_job(state.detail_job.as_ref()).await
}

pub async fn update_user_info(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    run_job(state.user_job.as_ref()).await
}

pub async fn webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let body: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "callback body is not valid JSON");
        ApiError::InvalidBody(format!("invalid JSON body: {e}"))
    })?;

    let reply = handle_event(
        state.approvals.as_ref(),
        state.verification_token.as_deref(),
        &body,
        state.clock.now(),
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "callback handling failed");
        ApiError::from(e)
    })?;

    Ok(Json(ChallengeResponse {
        challenge: reply.challenge().map(str::to_string),
    }))
}
