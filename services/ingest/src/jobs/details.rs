use async_trait::async_trait;

use lark_common::clock::SharedClock;
use lark_db::approvals::repositories::ApprovalRepository;

use super::acquire_token;
use crate::connector::{SyncJob, SyncSummary};
use crate::lark::{InstanceDetail, LarkClient};
use crate::sync::SyncError;

const SOURCE: &str = "approval_details";

/// Refreshes instances that have not reached a final status yet.
///
/// Picks the `detail_batch_size` least recently checked pending instances
/// and overwrites each with its full detail. One instance failing does not
/// stop the others; a failed instance is still stamped checked so it queues
/// behind the rest on the next run.
pub struct InstanceDetailSyncer<R> {
    client: LarkClient,
    repo: R,
    clock: SharedClock,
}

impl<R> InstanceDetailSyncer<R>
where
    R: ApprovalRepository,
{
    pub fn new(client: LarkClient, repo: R, clock: SharedClock) -> Self {
        Self {
            client,
            repo,
            clock,
        }
    }

    async fn mark_attempted(&self, instance_code: &str, progress: &str) {
        if let Err(e) = self
            .repo
            .mark_instance_checked(instance_code, self.clock.now())
            .await
        {
            tracing::error!(instance_code, progress, error = %e, "could not stamp instance as checked");
        }
    }
}

#[async_trait]
impl<R> SyncJob for InstanceDetailSyncer<R>
where
    R: ApprovalRepository,
{
    fn source_name(&self) -> &'static str {
        SOURCE
    }

    async fn run(&self) -> Result<SyncSummary, SyncError> {
        let token = acquire_token(&self.client, SOURCE).await?;

        let pending = self
            .repo
            .list_pending_instances(self.client.config().detail_batch_size)
            .await?;

        let mut summary = SyncSummary::new(SOURCE);
        summary.targets = pending.len();
        if pending.is_empty() {
            summary.message = "no pending approval instances to refresh".to_string();
            tracing::info!("{}", summary.message);
            return Ok(summary);
        }

        let total = pending.len();
        for (i, instance) in pending.iter().enumerate() {
            let code = instance.instance_code.as_str();
            let progress = format!("[{}/{}]", i + 1, total);

            let raw = match self.client.get_instance_detail(&token, code).await {
                Ok(raw) => raw,
                Err(e) => {
                    let err = SyncError::from_client(e);
                    if err.is_fatal_to_run() {
                        tracing::error!(instance_code = code, %progress, error = %err, "authorization lost, aborting");
                        return Err(err);
                    }
                    tracing::warn!(instance_code = code, %progress, error = %err, "detail fetch failed");
                    summary.errors += 1;
                    self.mark_attempted(code, &progress).await;
                    continue;
                }
            };
            summary.fetched += 1;

            let detail = match InstanceDetail::from_value(code, &raw) {
                Ok(detail) => detail,
                Err(e) => {
                    tracing::warn!(instance_code = code, %progress, reason = %e.reason, "skipping malformed detail");
                    summary.skipped += 1;
                    self.mark_attempted(code, &progress).await;
                    continue;
                }
            };

            match self
                .repo
                .update_instance_detail(&detail.into_update(), self.clock.now())
                .await
            {
                Ok(true) => {
                    tracing::debug!(instance_code = code, %progress, "instance detail updated");
                    summary.written += 1;
                }
                Ok(false) => {
                    tracing::warn!(instance_code = code, %progress, "instance no longer stored");
                    summary.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(instance_code = code, %progress, error = %e, "detail write failed");
                    summary.errors += 1;
                    self.mark_attempted(code, &progress).await;
                }
            }
        }

        summary.message = format!(
            "updated {} of {} pending approval instances ({} failed)",
            summary.written, total, summary.errors
        );
        tracing::info!(?summary, "approval detail refresh completed");
        Ok(summary)
    }
}
