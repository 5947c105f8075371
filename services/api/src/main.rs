mod error;
mod feishu;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use lark_common::clock::{SharedClock, SystemClock};
use lark_common::types::ServiceInfo;
use lark_config::{init_tracing, AppConfig, LarkConfig};
use lark_db::approvals::pg_repository::PgApprovalRepository;
use lark_db::approvals::repositories::ApprovalRepository;
use lark_db::users::pg_repository::PgLarkUserRepository;
use lark_ingest::connector::SyncJob;
use lark_ingest::jobs::{ApprovalInstanceSyncer, InstanceDetailSyncer, UserProfileSyncer};
use lark_ingest::lark::LarkClient;
use tower_http::trace::TraceLayer;

/// Shared handles for the trigger and callback routes. Runs are not
/// serialized here; the scheduler calling these routes must not overlap
/// runs of the same job.
#[derive(Clone)]
pub struct AppState {
    pub instance_job: Arc<dyn SyncJob>,
    pub detail_job: Arc<dyn SyncJob>,
    pub user_job: Arc<dyn SyncJob>,
    pub approvals: Arc<dyn ApprovalRepository>,
    pub clock: SharedClock,
    pub verification_token: Option<String>,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn info() -> Json<ServiceInfo> {
    Json(ServiceInfo::new("lark-api"))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .merge(feishu::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    init_tracing("info");

    let config = AppConfig::from_env().expect("failed to load config");
    let lark_config = LarkConfig::from_env().expect("failed to load lark config");
    tracing::info!(service = "lark-api", "starting");

    let pool = lark_db::create_pool(&config.database_url)
        .await
        .expect("failed to create database pool");
    if config.run_migrations {
        lark_db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
    }

    let clock: SharedClock = Arc::new(SystemClock);
    let client = || LarkClient::new(lark_config.clone()).expect("failed to create lark client");

    let state = AppState {
        instance_job: Arc::new(ApprovalInstanceSyncer::new(
            client(),
            PgApprovalRepository::new(pool.clone()),
            clock.clone(),
        )),
        detail_job: Arc::new(InstanceDetailSyncer::new(
            client(),
            PgApprovalRepository::new(pool.clone()),
            clock.clone(),
        )),
        user_job: Arc::new(UserProfileSyncer::new(
            client(),
            PgLarkUserRepository::new(pool.clone()),
            clock.clone(),
        )),
        approvals: Arc::new(PgApprovalRepository::new(pool)),
        clock,
        verification_token: lark_config.verification_token.clone(),
    };

    let app = build_router(state);
    let addr: SocketAddr = config.bind_addr().parse().expect("invalid bind address");

    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
