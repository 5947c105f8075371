pub mod handlers;
pub mod responses;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/feishu/getNewApprovalInstances",
            get(handlers::get_new_approval_instances).post(handlers::get_new_approval_instances),
        )
        .route(
            "/feishu/updateApprovalInstances",
            get(handlers::update_approval_instances).post(handlers::update_approval_instances),
        )
        .route(
            "/feishu/updateUserInfo",
            get(handlers::update_user_info).post(handlers::update_user_info),
        )
        .route("/feishu/webhook", post(handlers::webhook))
}
