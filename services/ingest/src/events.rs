//! Event callbacks pushed by the open platform.
//!
//! Two shapes arrive on the same endpoint: the one-off `url_verification`
//! handshake `{type, challenge, token}` and schema 2.0 events
//! `{schema, header: {event_type, token, ..}, event: {..}}`.

use chrono::{DateTime, Utc};
use serde_json::Value;
use subtle::ConstantTimeEq;

use lark_common::error::LarkError;
use lark_db::approvals::repositories::ApprovalRepository;

pub const STATUS_CHANGE_EVENT: &str = "approval.instance.status_change";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookReply {
    /// Echo of the handshake challenge.
    Challenge(String),
    /// Event handled (or deliberately ignored).
    Accepted {
        event_type: String,
        challenge: Option<String>,
    },
}

impl WebhookReply {
    pub fn challenge(&self) -> Option<&str> {
        match self {
            Self::Challenge(c) => Some(c.as_str()),
            Self::Accepted { challenge, .. } => challenge.as_deref(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("verification token mismatch")]
    Unauthorized,

    #[error("{0}")]
    Malformed(&'static str),

    #[error("failed to update approval instance status: {0}")]
    Store(#[from] LarkError),
}

/// Handle one callback body.
///
/// When `expected_token` is set, the token carried by the body must match it.
pub async fn handle_event<R>(
    repo: &R,
    expected_token: Option<&str>,
    body: &Value,
    now: DateTime<Utc>,
) -> Result<WebhookReply, WebhookError>
where
    R: ApprovalRepository + ?Sized,
{
    if let Some(expected) = expected_token {
        let sent = body
            .pointer("/header/token")
            .or_else(|| body.get("token"))
            .and_then(Value::as_str);
        if !token_matches(sent, expected) {
            tracing::warn!("rejecting callback with bad verification token");
            return Err(WebhookError::Unauthorized);
        }
    }

    let challenge = body
        .get("challenge")
        .and_then(Value::as_str)
        .map(str::to_string);

    if body.get("type").and_then(Value::as_str) == Some("url_verification") {
        let challenge = challenge.ok_or(WebhookError::Malformed("Missing challenge"))?;
        tracing::info!("answering url verification");
        return Ok(WebhookReply::Challenge(challenge));
    }

    let event_type = body
        .pointer("/header/event_type")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or(WebhookError::Malformed("Missing event type"))?;

    if event_type == STATUS_CHANGE_EVENT {
        let instance_code = non_empty(body.pointer("/event/instance_code"));
        let status = non_empty(body.pointer("/event/status"));
        let (Some(instance_code), Some(status)) = (instance_code, status) else {
            return Err(WebhookError::Malformed("Missing required fields"));
        };

        if repo.update_instance_status(instance_code, status, now).await? {
            tracing::info!(instance_code, status, "approval instance status updated");
        } else {
            tracing::warn!(instance_code, status, "status change for unknown instance");
        }
    } else {
        tracing::info!(event_type, "ignoring unhandled event type");
    }

    Ok(WebhookReply::Accepted {
        event_type: event_type.to_string(),
        challenge,
    })
}

/// Constant-time over equal lengths; a length mismatch fails early.
fn token_matches(sent: Option<&str>, expected: &str) -> bool {
    sent.is_some_and(|sent| bool::from(sent.as_bytes().ct_eq(expected.as_bytes())))
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}
