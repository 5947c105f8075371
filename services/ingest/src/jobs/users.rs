use async_trait::async_trait;

use lark_common::clock::SharedClock;
use lark_db::users::repositories::LarkUserRepository;

use super::acquire_token;
use crate::connector::{SyncJob, SyncSummary};
use crate::lark::{LarkClient, RemoteUser};
use crate::sync::gate::changed_fields;
use crate::sync::SyncError;

const SOURCE: &str = "lark_users";

/// Re-reads stored users from the contact API and writes only real changes.
///
/// Users are taken least recently checked first. Every attempt that does not
/// write a new profile (unchanged, unreachable, malformed) still stamps the
/// user as checked so the next run moves on to other users.
pub struct UserProfileSyncer<R> {
    client: LarkClient,
    repo: R,
    clock: SharedClock,
}

impl<R> UserProfileSyncer<R>
where
    R: LarkUserRepository,
{
    pub fn new(client: LarkClient, repo: R, clock: SharedClock) -> Self {
        Self {
            client,
            repo,
            clock,
        }
    }

    async fn mark_attempted(&self, user_id: &str, progress: &str) -> bool {
        match self.repo.mark_checked(user_id, self.clock.now()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(user_id, progress, error = %e, "could not stamp user as checked");
                false
            }
        }
    }
}

#[async_trait]
impl<R> SyncJob for UserProfileSyncer<R>
where
    R: LarkUserRepository,
{
    fn source_name(&self) -> &'static str {
        SOURCE
    }

    async fn run(&self) -> Result<SyncSummary, SyncError> {
        let token = acquire_token(&self.client, SOURCE).await?;

        let users = self
            .repo
            .list_users_for_refresh(self.client.config().user_batch_size)
            .await?;

        let mut summary = SyncSummary::new(SOURCE);
        summary.targets = users.len();
        let total = users.len();

        for (i, stored) in users.iter().enumerate() {
            let user_id = stored.user_id.as_str();
            let progress = format!("[{}/{}]", i + 1, total);

            let raw = match self.client.get_user(&token, user_id).await {
                Ok(raw) => raw,
                Err(e) => {
                    let err = SyncError::from_client(e);
                    if err.is_fatal_to_run() {
                        tracing::error!(user_id, %progress, error = %err, "authorization lost, aborting");
                        return Err(err);
                    }
                    tracing::warn!(user_id, %progress, error = %err, "user fetch failed");
                    summary.errors += 1;
                    self.mark_attempted(user_id, &progress).await;
                    continue;
                }
            };
            summary.fetched += 1;

            let remote = match RemoteUser::from_value(user_id, &raw) {
                Ok(remote) => remote,
                Err(e) => {
                    tracing::warn!(user_id, %progress, reason = %e.reason, "skipping malformed user");
                    summary.skipped += 1;
                    self.mark_attempted(user_id, &progress).await;
                    continue;
                }
            };

            let now = self.clock.now();
            let changed = changed_fields(&stored.profile, &remote.profile);
            if changed.is_empty() {
                if self.mark_attempted(user_id, &progress).await {
                    summary.unchanged += 1;
                } else {
                    summary.errors += 1;
                }
                continue;
            }

            match self.repo.update_profile(user_id, &remote.profile, now).await {
                Ok(true) => {
                    tracing::info!(user_id, %progress, fields = ?changed, "user profile updated");
                    summary.written += 1;
                }
                Ok(false) => {
                    tracing::warn!(user_id, %progress, "user no longer stored");
                    summary.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(user_id, %progress, error = %e, "user profile write failed");
                    summary.errors += 1;
                    self.mark_attempted(user_id, &progress).await;
                }
            }
        }

        summary.message = format!(
            "user refresh completed: {} updated, {} unchanged, {} failed",
            summary.written, summary.unchanged, summary.errors
        );
        tracing::info!(?summary, "user profile refresh completed");
        Ok(summary)
    }
}
