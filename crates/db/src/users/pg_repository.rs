use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::users::models::{LarkUser, UserProfile};
use crate::users::repositories::LarkUserRepository;
use lark_common::error::{LarkError, LarkResult};

#[derive(Clone)]
pub struct PgLarkUserRepository {
    pool: PgPool,
}

impl PgLarkUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> LarkUser {
        LarkUser {
            user_id: row.get("user_id"),
            profile: UserProfile {
                name: row.get("name"),
                mobile: row.get("mobile"),
                description: row.get("description"),
                union_id: row.get("union_id"),
                open_id: row.get("open_id"),
            },
            last_updated: row.get("last_updated"),
            last_checked: row.get("last_checked"),
        }
    }
}

#[async_trait]
impl LarkUserRepository for PgLarkUserRepository {
    async fn list_users_for_refresh(&self, limit: i64) -> LarkResult<Vec<LarkUser>> {
        let rows = sqlx::query(
            "select user_id, name, mobile, description, union_id, open_id, last_updated, last_checked
             from lark_users
             order by last_checked asc nulls first, user_id asc
             limit $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LarkError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Self::map_row).collect())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> LarkResult<bool> {
        let result = sqlx::query(
            "update lark_users set
               name = $2,
               mobile = $3,
               description = $4,
               union_id = $5,
               open_id = $6,
               last_updated = greatest(last_updated, $7),
               last_checked = greatest(last_checked, $7)
             where user_id = $1",
        )
        .bind(user_id)
        .bind(&profile.name)
        .bind(&profile.mobile)
        .bind(&profile.description)
        .bind(&profile.union_id)
        .bind(&profile.open_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| LarkError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_checked(&self, user_id: &str, now: DateTime<Utc>) -> LarkResult<()> {
        sqlx::query(
            "update lark_users set last_checked = greatest(last_checked, $2) where user_id = $1",
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| LarkError::Database(e.to_string()))?;
        Ok(())
    }
}
