use lark_common::error::LarkError;

use crate::lark::{LarkClientError, TransformError};

/// Failure taxonomy of a sync run.
///
/// `Auth` aborts the run, `Query` aborts the current target (or the run when
/// the target list itself cannot be read), `Fetch` ends pagination for the
/// current target, `Transform` skips one record.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("authentication failed: {0}")]
    Auth(LarkClientError),

    #[error("store query failed: {0}")]
    Query(#[from] LarkError),

    #[error("remote fetch failed: {0}")]
    Fetch(LarkClientError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl SyncError {
    /// Classify a client error: credential/token problems are fatal to the run.
    pub fn from_client(err: LarkClientError) -> Self {
        if err.is_unauthorized() {
            Self::Auth(err)
        } else {
            Self::Fetch(err)
        }
    }

    pub fn is_fatal_to_run(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}
