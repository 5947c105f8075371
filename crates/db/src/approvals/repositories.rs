use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::approvals::models::{
    ApprovalDefinition, ConflictPolicy, InstanceDetailUpdate, NewApprovalInstance,
    PendingInstance,
};
use lark_common::error::LarkResult;

#[async_trait]
pub trait ApprovalRepository: Send + Sync {
    /// Approval definitions with `enabled = true`, ordered by code.
    async fn list_enabled_approvals(&self) -> LarkResult<Vec<ApprovalDefinition>>;

    /// Most recent `apply_time` stored for an approval.
    /// `Ok(None)` when the approval has no instances yet.
    async fn latest_apply_time(&self, approval_code: &str) -> LarkResult<Option<DateTime<Utc>>>;

    /// Write one batch of instances keyed by `instance_code`.
    /// Returns the number of rows inserted or updated.
    async fn upsert_instances(
        &self,
        rows: &[NewApprovalInstance],
        policy: ConflictPolicy,
        now: DateTime<Utc>,
    ) -> LarkResult<u64>;

    /// Instances whose status is unknown or `PENDING`, least recently checked first.
    async fn list_pending_instances(&self, limit: i64) -> LarkResult<Vec<PendingInstance>>;

    /// Overwrite an instance with its full detail and stamp it checked.
    /// Returns `false` if no row matched.
    async fn update_instance_detail(
        &self,
        detail: &InstanceDetailUpdate,
        now: DateTime<Utc>,
    ) -> LarkResult<bool>;

    /// Record a refresh attempt that produced no detail, moving the instance
    /// to the back of the pending queue.
    async fn mark_instance_checked(&self, instance_code: &str, now: DateTime<Utc>) -> LarkResult<()>;

    /// Set an instance status from a callback event. Returns `false` if no row matched.
    async fn update_instance_status(
        &self,
        instance_code: &str,
        status: &str,
        now: DateTime<Utc>,
    ) -> LarkResult<bool>;
}
