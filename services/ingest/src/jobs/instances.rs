use async_trait::async_trait;
use chrono::Duration;

use lark_common::clock::SharedClock;
use lark_db::approvals::models::{ApprovalDefinition, ConflictPolicy};
use lark_db::approvals::repositories::ApprovalRepository;

use super::acquire_token;
use crate::connector::{SyncJob, SyncSummary};
use crate::lark::{AccessToken, LarkClient};
use crate::sync::{resolve_start, walk_instance_pages, write_chunked, SyncError};

const SOURCE: &str = "approval_instances";

/// Imports approval instances created since the last stored one.
///
/// For every enabled approval the listing is walked from the newest stored
/// `apply_time` (or `sync_window_days` back for a new approval) up to now.
/// Existing rows are never touched; the detail refresh owns them.
pub struct ApprovalInstanceSyncer<R> {
    client: LarkClient,
    repo: R,
    clock: SharedClock,
}

impl<R> ApprovalInstanceSyncer<R>
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

    async fn sync_target(
        &self,
        token: &AccessToken,
        target: &ApprovalDefinition,
        summary: &mut SyncSummary,
    ) -> Result<(), SyncError> {
        let code = target.approval_code.as_str();
        let now = self.clock.now();
        let default_epoch = now - Duration::days(i64::from(self.client.config().sync_window_days));

        let start = match resolve_start(&self.repo, code, default_epoch).await {
            Ok(start) => start,
            Err(e) => {
                tracing::error!(approval_code = code, error = %e, "resume point lookup failed, skipping approval");
                summary.targets_failed += 1;
                return Ok(());
            }
        };

        tracing::info!(approval_code = code, %start, end = %now, "syncing approval instances");
        let walk = walk_instance_pages(&self.client, token, code, start, now).await;
        summary.fetched += walk.records.len();
        summary.skipped += walk.skipped;

        let rows = walk
            .records
            .into_iter()
            .map(|record| record.into_row(code))
            .collect();
        let outcome = write_chunked(
            &self.repo,
            code,
            rows,
            self.client.config().write_batch_size,
            ConflictPolicy::IgnoreDuplicates,
            now,
        )
        .await;
        summary.written += outcome.written;
        summary.errors += outcome.failed_rows;

        tracing::info!(
            approval_code = code,
            pages = walk.pages,
            written = outcome.written,
            failed_chunks = outcome.failed_chunks,
            "approval synced"
        );

        match walk.error {
            Some(e) if e.is_fatal_to_run() => Err(e),
            Some(_) => {
                summary.targets_failed += 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<R> SyncJob for ApprovalInstanceSyncer<R>
where
    R: ApprovalRepository,
{
    fn source_name(&self) -> &'static str {
        SOURCE
    }

    async fn run(&self) -> Result<SyncSummary, SyncError> {
        let token = acquire_token(&self.client, SOURCE).await?;

        let targets = self.repo.list_enabled_approvals().await.map_err(|e| {
            tracing::error!(error = %e, "could not list enabled approvals");
            SyncError::Query(e)
        })?;

        let mut summary = SyncSummary::new(SOURCE);
        if targets.is_empty() {
            summary.message = "no enabled approval definitions to sync".to_string();
            tracing::info!("{}", summary.message);
            return Ok(summary);
        }

        summary.targets = targets.len();
        for target in &targets {
            if let Err(e) = self.sync_target(&token, target, &mut summary).await {
                tracing::error!(
                    approval_code = %target.approval_code,
                    written = summary.written,
                    error = %e,
                    "authorization lost mid-run, aborting"
                );
                return Err(e);
            }
        }

        summary.message = format!(
            "sync completed: {} new approval instances ({} approvals, {} failed, {} records skipped)",
            summary.written, summary.targets, summary.targets_failed, summary.skipped
        );
        tracing::info!(?summary, "approval instance sync completed");
        Ok(summary)
    }
}
