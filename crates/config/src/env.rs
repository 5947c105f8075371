use lark_common::error::{LarkError, LarkResult};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub run_migrations: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    /// Loads `.env` file if present, then reads required vars.
    pub fn from_env() -> LarkResult<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: get_var("DATABASE_URL")?,
            host: get_var_or("HOST", "0.0.0.0"),
            port: parse_var_or("PORT", 8080)?,
            log_level: get_var_or("LOG_LEVEL", "info"),
            run_migrations: parse_var_or("RUN_MIGRATIONS", false)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub(crate) fn get_var(key: &str) -> LarkResult<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(LarkError::Config(format!("{key} is required but not set"))),
    }
}

pub(crate) fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

pub(crate) fn get_var_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an optional var, falling back to `default` when unset.
/// A set-but-unparseable value is a configuration error rather than a silent default.
pub(crate) fn parse_var_or<T>(key: &str, default: T) -> LarkResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_var_opt(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| LarkError::Config(format!("invalid {key}: {e}"))),
        None => Ok(default),
    }
}
