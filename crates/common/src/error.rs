use thiserror::Error;

/// Failures of the configuration and store layers.
#[derive(Debug, Error)]
pub enum LarkError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),
}

pub type LarkResult<T> = Result<T, LarkError>;
