use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::approvals::models::{
    ApprovalDefinition, ConflictPolicy, InstanceDetailUpdate, NewApprovalInstance,
    PendingInstance,
};
use crate::approvals::repositories::ApprovalRepository;
use lark_common::error::{LarkError, LarkResult};

#[derive(Clone)]
pub struct PgApprovalRepository {
    pool: PgPool,
}

impl PgApprovalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_definition_row(row: PgRow) -> ApprovalDefinition {
        ApprovalDefinition {
            approval_code: row.get("approval_code"),
            name: row.get("name"),
            enabled: row.get("enabled"),
        }
    }

    fn map_pending_row(row: PgRow) -> PendingInstance {
        PendingInstance {
            instance_code: row.get("instance_code"),
            approval_code: row.get("approval_code"),
            status: row.get("status"),
            last_updated: row.get("last_updated"),
            last_checked: row.get("last_checked"),
        }
    }
}

#[async_trait]
impl ApprovalRepository for PgApprovalRepository {
    async fn list_enabled_approvals(&self) -> LarkResult<Vec<ApprovalDefinition>> {
        let rows = sqlx::query(
            "select approval_code, name, enabled from approvals
             where enabled = true
             order by approval_code",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LarkError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Self::map_definition_row).collect())
    }

    async fn latest_apply_time(&self, approval_code: &str) -> LarkResult<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            "select apply_time from approval_instances
             where approval_code = $1
             order by apply_time desc
             limit 1",
        )
        .bind(approval_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LarkError::Database(e.to_string()))?;

        Ok(row.map(|r| r.get("apply_time")))
    }

    async fn upsert_instances(
        &self,
        rows: &[NewApprovalInstance],
        policy: ConflictPolicy,
        now: DateTime<Utc>,
    ) -> LarkResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "insert into approval_instances (instance_code, approval_code, status, apply_time) ",
        );
        qb.push_values(rows.iter(), |mut b, row| {
            b.push_bind(&row.instance_code)
                .push_bind(&row.approval_code)
                .push_bind(&row.status)
                .push_bind(row.apply_time);
        });

        match policy {
            ConflictPolicy::IgnoreDuplicates => {
                qb.push(" on conflict (instance_code) do nothing");
            }
            ConflictPolicy::UpdateInPlace => {
                qb.push(
                    " on conflict (instance_code) do update set
                       approval_code = excluded.approval_code,
                       status = excluded.status,
                       apply_time = excluded.apply_time,
                       last_updated = greatest(approval_instances.last_updated, ",
                );
                qb.push_bind(now);
                qb.push(")");
            }
        }

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| LarkError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn list_pending_instances(&self, limit: i64) -> LarkResult<Vec<PendingInstance>> {
        let rows = sqlx::query(
            "select instance_code, approval_code, status, last_updated, last_checked
             from approval_instances
             where status is null or status = 'PENDING'
             order by last_checked asc nulls first, apply_time asc
             limit $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LarkError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Self::map_pending_row).collect())
    }

    async fn update_instance_detail(
        &self,
        detail: &InstanceDetailUpdate,
        now: DateTime<Utc>,
    ) -> LarkResult<bool> {
        let result = sqlx::query(
            "update approval_instances set
               status = $2,
               department_id = $3,
               end_time = $4,
               form = $5,
               open_id = $6,
               reverted = $7,
               serial_number = $8,
               start_time = $9,
               task_list = $10,
               timeline = $11,
               user_id = $12,
               uuid = $13,
               last_updated = greatest(last_updated, $14),
               last_checked = greatest(last_checked, $14)
             where instance_code = $1",
        )
        .bind(&detail.instance_code)
        .bind(&detail.status)
        .bind(&detail.department_id)
        .bind(detail.end_time)
        .bind(&detail.form)
        .bind(&detail.open_id)
        .bind(detail.reverted)
        .bind(&detail.serial_number)
        .bind(detail.start_time)
        .bind(&detail.task_list)
        .bind(&detail.timeline)
        .bind(&detail.user_id)
        .bind(&detail.uuid)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| LarkError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_instance_checked(&self, instance_code: &str, now: DateTime<Utc>) -> LarkResult<()> {
        sqlx::query(
            "update approval_instances set last_checked = greatest(last_checked, $2)
             where instance_code = $1",
        )
        .bind(instance_code)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| LarkError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update_instance_status(
        &self,
        instance_code: &str,
        status: &str,
        now: DateTime<Utc>,
    ) -> LarkResult<bool> {
        let result = sqlx::query(
            "update approval_instances
             set status = $2, last_updated = greatest(last_updated, $3)
             where instance_code = $1",
        )
        .bind(instance_code)
        .bind(status)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| LarkError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
