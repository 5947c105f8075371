use chrono::{DateTime, Utc};
use lark_db::approvals::repositories::ApprovalRepository;

use super::SyncError;

/// Resume point for an approval: the newest stored `apply_time`, or
/// `default_epoch` when nothing has been stored yet.
///
/// "No rows" is a normal outcome; a failing query is a `SyncError::Query`
/// that the caller treats as fatal to this target only.
pub async fn resolve_start<R>(
    repo: &R,
    approval_code: &str,
    default_epoch: DateTime<Utc>,
) -> Result<DateTime<Utc>, SyncError>
where
    R: ApprovalRepository + ?Sized,
{
    match repo.latest_apply_time(approval_code).await? {
        Some(latest) => Ok(latest),
        None => {
            tracing::debug!(approval_code, %default_epoch, "no stored instances, using default epoch");
            Ok(default_epoch)
        }
    }
}
