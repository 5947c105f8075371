use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lark_ingest::events::WebhookError;
use lark_ingest::sync::SyncError;

pub enum ApiError {
    Sync(SyncError),
    Webhook(WebhookError),
    InvalidBody(String),
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        Self::Sync(err)
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        Self::Webhook(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Webhook(WebhookError::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, "Invalid request".to_string())
            }
            Self::Webhook(other) => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
            Self::Sync(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Self::InvalidBody(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
