use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An approval definition configured for sync (`approvals` table).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovalDefinition {
    pub approval_code: String,
    pub name: Option<String>,
    pub enabled: bool,
}

/// Listing-level instance row written by the new-instance import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewApprovalInstance {
    pub instance_code: String,
    pub approval_code: String,
    pub status: Option<String>,
    pub apply_time: DateTime<Utc>,
}

/// Full instance detail written by the detail refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceDetailUpdate {
    pub instance_code: String,
    pub status: String,
    pub department_id: Option<String>,
    pub end_time: Option<DateTime<Utc>>,
    pub form: serde_json::Value,
    pub open_id: Option<String>,
    pub reverted: bool,
    pub serial_number: Option<String>,
    pub start_time: DateTime<Utc>,
    pub task_list: serde_json::Value,
    pub timeline: serde_json::Value,
    pub user_id: Option<String>,
    pub uuid: Option<String>,
}

/// An instance still waiting for its final detail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingInstance {
    pub instance_code: String,
    pub approval_code: String,
    pub status: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Last detail refresh attempt, whether or not it succeeded.
    pub last_checked: Option<DateTime<Utc>>,
}

/// What to do when an incoming row collides with a stored one on `instance_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Keep the stored row untouched.
    IgnoreDuplicates,
    /// Overwrite synced fields and advance `last_updated`.
    UpdateInPlace,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IgnoreDuplicates => "ignore_duplicates",
            Self::UpdateInPlace => "update_in_place",
        }
    }
}
