use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile fields tracked for change detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub description: Option<String>,
    pub union_id: Option<String>,
    pub open_id: Option<String>,
}

/// A stored Lark user (`lark_users` table).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LarkUser {
    pub user_id: String,
    #[serde(flatten)]
    pub profile: UserProfile,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_checked: Option<DateTime<Utc>>,
}
