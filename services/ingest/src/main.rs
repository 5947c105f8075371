use std::sync::Arc;

use lark_common::clock::{SharedClock, SystemClock};
use lark_config::{init_tracing, AppConfig, LarkConfig};
use lark_db::approvals::pg_repository::PgApprovalRepository;
use lark_db::users::pg_repository::PgLarkUserRepository;
use lark_ingest::connector::{select_jobs, SyncJob};
use lark_ingest::jobs::{ApprovalInstanceSyncer, InstanceDetailSyncer, UserProfileSyncer};
use lark_ingest::lark::LarkClient;

/// One-shot run of the sync jobs, for cron-style scheduling.
///
/// With no arguments every job runs in order; otherwise only the named ones
/// (`approval_instances`, `approval_details`, `lark_users`). An unknown name
/// exits with status 1 before any job runs.
#[tokio::main]
async fn main() {
    init_tracing("info");

    let config = AppConfig::from_env().expect("failed to load config");
    let lark_config = LarkConfig::from_env().expect("failed to load lark config");
    tracing::info!(service = "lark-ingest", "starting");

    let pool = lark_db::create_pool(&config.database_url)
        .await
        .expect("failed to connect to database");
    if config.run_migrations {
        lark_db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
    }

    let clock: SharedClock = Arc::new(SystemClock);
    let client = || LarkClient::new(lark_config.clone()).expect("failed to create lark client");

    let jobs: Vec<Box<dyn SyncJob>> = vec![
        Box::new(ApprovalInstanceSyncer::new(
            client(),
            PgApprovalRepository::new(pool.clone()),
            clock.clone(),
        )),
        Box::new(InstanceDetailSyncer::new(
            client(),
            PgApprovalRepository::new(pool.clone()),
            clock.clone(),
        )),
        Box::new(UserProfileSyncer::new(
            client(),
            PgLarkUserRepository::new(pool.clone()),
            clock,
        )),
    ];

    let names: Vec<String> = std::env::args().skip(1).collect();
    let selected = match select_jobs(&jobs, &names) {
        Ok(selected) => selected,
        Err(unknown) => {
            tracing::error!(job = %unknown, "unknown job name");
            std::process::exit(1);
        }
    };
    let mut failed = false;

    for job in selected {
        tracing::info!(source = job.source_name(), "starting job");
        match job.run().await {
            Ok(summary) => {
                tracing::info!(
                    source = summary.source,
                    written = summary.written,
                    errors = summary.errors,
                    message = %summary.message,
                    "job finished"
                );
            }
            Err(e) => {
                tracing::error!(source = job.source_name(), error = %e, "job failed");
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}
