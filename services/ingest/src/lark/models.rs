use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use lark_db::approvals::models::{InstanceDetailUpdate, NewApprovalInstance};
use lark_db::users::models::UserProfile;

/// A record that could not be turned into its typed shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed record {record}: {reason}")]
pub struct TransformError {
    /// Best-effort identifier of the offending record (`<unknown>` if absent).
    pub record: String,
    pub reason: String,
}

impl TransformError {
    fn new(record: &str, reason: impl Into<String>) -> Self {
        Self {
            record: record.to_string(),
            reason: reason.into(),
        }
    }
}

/// Common `{code, msg, data}` envelope of open platform responses.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// Body of `auth/v3/tenant_access_token/internal`. The token sits beside `code`, not under `data`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub tenant_access_token: Option<String>,
    pub expire: Option<i64>,
}

/// `data` of the instance listing. Items stay raw until validated one by one.
#[derive(Debug, Default, Deserialize)]
pub struct InstanceListData {
    #[serde(default)]
    pub instance_list: Vec<Value>,
    pub has_more: Option<bool>,
    pub page_token: Option<String>,
}

/// `data` of the contact user endpoint.
#[derive(Debug, Deserialize)]
pub struct UserData {
    pub user: Value,
}

/// Validated listing item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteInstance {
    pub instance_code: String,
    pub status: Option<String>,
    pub start_time: DateTime<Utc>,
}

impl RemoteInstance {
    pub fn from_value(value: &Value) -> Result<Self, TransformError> {
        let instance_code = required_str(value, "instance_code", "<unknown>")?;
        let start_time = value
            .get("start_time")
            .and_then(parse_millis)
            .ok_or_else(|| TransformError::new(&instance_code, "missing or invalid start_time"))?;

        Ok(Self {
            status: optional_str(value, "status"),
            start_time,
            instance_code,
        })
    }

    pub fn into_row(self, approval_code: &str) -> NewApprovalInstance {
        NewApprovalInstance {
            instance_code: self.instance_code,
            approval_code: approval_code.to_string(),
            status: self.status,
            apply_time: self.start_time,
        }
    }
}

/// Validated instance detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceDetail {
    pub instance_code: String,
    pub approval_code: Option<String>,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub department_id: Option<String>,
    pub open_id: Option<String>,
    pub user_id: Option<String>,
    pub serial_number: Option<String>,
    pub uuid: Option<String>,
    pub reverted: bool,
    pub form: Value,
    pub task_list: Value,
    pub timeline: Value,
}

impl InstanceDetail {
    /// Validate the detail payload fetched for `instance_code`. A payload that
    /// names another instance is rejected.
    pub fn from_value(instance_code: &str, value: &Value) -> Result<Self, TransformError> {
        let returned_code = optional_str(value, "instance_code");
        if let Some(other) = returned_code.as_deref().filter(|c| *c != instance_code) {
            return Err(TransformError::new(
                instance_code,
                format!("response is for a different instance ({other})"),
            ));
        }
        let code = instance_code.to_string();
        let status = required_str(value, "status", &code)?;
        let start_time = value
            .get("start_time")
            .and_then(parse_millis)
            .ok_or_else(|| TransformError::new(&code, "missing or invalid start_time"))?;
        // "0" marks an instance that has not finished yet
        let end_time = value
            .get("end_time")
            .and_then(parse_millis)
            .filter(|t| t.timestamp_millis() > 0);

        let form = match value.get("form") {
            Some(Value::String(raw)) if raw.is_empty() => Value::Null,
            Some(Value::String(raw)) => serde_json::from_str(raw)
                .map_err(|e| TransformError::new(&code, format!("form is not valid JSON: {e}")))?,
            Some(other) => other.clone(),
            None => Value::Null,
        };

        Ok(Self {
            approval_code: optional_str(value, "approval_code"),
            status,
            start_time,
            end_time,
            department_id: optional_str(value, "department_id"),
            open_id: optional_str(value, "open_id"),
            user_id: optional_str(value, "user_id"),
            serial_number: optional_str(value, "serial_number"),
            uuid: optional_str(value, "uuid"),
            reverted: value.get("reverted").and_then(Value::as_bool).unwrap_or(false),
            form,
            task_list: value.get("task_list").cloned().unwrap_or(Value::Array(Vec::new())),
            timeline: value.get("timeline").cloned().unwrap_or(Value::Array(Vec::new())),
            instance_code: code,
        })
    }

    pub fn into_update(self) -> InstanceDetailUpdate {
        InstanceDetailUpdate {
            instance_code: self.instance_code,
            status: self.status,
            department_id: self.department_id,
            end_time: self.end_time,
            form: self.form,
            open_id: self.open_id,
            reverted: self.reverted,
            serial_number: self.serial_number,
            start_time: self.start_time,
            task_list: self.task_list,
            timeline: self.timeline,
            user_id: self.user_id,
            uuid: self.uuid,
        }
    }
}

/// Validated contact user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteUser {
    pub user_id: String,
    pub profile: UserProfile,
}

impl RemoteUser {
    pub fn from_value(user_id: &str, value: &Value) -> Result<Self, TransformError> {
        if !value.is_object() {
            return Err(TransformError::new(user_id, "user payload is not an object"));
        }
        let returned_id = optional_str(value, "user_id");
        if let Some(other) = returned_id.as_deref().filter(|id| *id != user_id) {
            return Err(TransformError::new(
                user_id,
                format!("response is for a different user ({other})"),
            ));
        }

        Ok(Self {
            user_id: user_id.to_string(),
            profile: UserProfile {
                name: optional_str(value, "name"),
                mobile: optional_str(value, "mobile"),
                description: optional_str(value, "description"),
                union_id: optional_str(value, "union_id"),
                open_id: optional_str(value, "open_id"),
            },
        })
    }
}

/// Epoch milliseconds given as a JSON number or a numeric string.
pub fn parse_millis(value: &Value) -> Option<DateTime<Utc>> {
    let millis = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    Utc.timestamp_millis_opt(millis).single()
}

fn optional_str(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn required_str(value: &Value, field: &str, record: &str) -> Result<String, TransformError> {
    optional_str(value, field)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| TransformError::new(record, format!("missing {field}")))
}
