use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::users::models::{LarkUser, UserProfile};
use lark_common::error::LarkResult;

#[async_trait]
pub trait LarkUserRepository: Send + Sync {
    /// Users least recently checked against the remote profile, never-checked first.
    async fn list_users_for_refresh(&self, limit: i64) -> LarkResult<Vec<LarkUser>>;

    /// Overwrite the tracked profile fields and advance `last_updated`.
    /// Returns `false` if no row matched.
    async fn update_profile(
        &self,
        user_id: &str,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> LarkResult<bool>;

    /// Record that the user was compared against the remote, without touching the profile.
    async fn mark_checked(&self, user_id: &str, now: DateTime<Utc>) -> LarkResult<()>;
}
