//! The sync jobs. Each one acquires a tenant token up front and then works
//! through its queue (approval definitions, pending instances or users).

pub mod details;
pub mod instances;
pub mod users;

pub use details::InstanceDetailSyncer;
pub use instances::ApprovalInstanceSyncer;
pub use users::UserProfileSyncer;

use crate::lark::{AccessToken, LarkClient};
use crate::sync::SyncError;

/// Acquire the run's token. Any failure here aborts the run before the store
/// is touched.
pub(crate) async fn acquire_token(
    client: &LarkClient,
    source: &'static str,
) -> Result<AccessToken, SyncError> {
    client.tenant_access_token().await.map_err(|e| {
        tracing::error!(source, error = %e, "could not obtain tenant access token, aborting run");
        SyncError::Auth(e)
    })
}
