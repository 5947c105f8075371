use lark_common::error::LarkResult;

use crate::env::{get_var, get_var_opt, get_var_or, parse_var_or};

pub const DEFAULT_BASE_URL: &str = "https://open.feishu.cn/open-apis";

/// Credentials and tuning knobs for the Lark open platform jobs.
#[derive(Debug, Clone)]
pub struct LarkConfig {
    pub app_id: String,
    pub app_secret: String,
    pub base_url: String,
    /// Event callback verification token. Webhook requests are not checked when unset.
    pub verification_token: Option<String>,
    /// Look-back window used as the resume point for approvals with no stored instances.
    pub sync_window_days: u32,
    /// Page size sent to the instance listing endpoint (the API caps it at 100).
    pub page_size: u32,
    /// Upper bound on pages walked per approval in a single run.
    pub max_pages: u32,
    /// Rows per multi-row insert.
    pub write_batch_size: usize,
    pub detail_batch_size: i64,
    pub user_batch_size: i64,
    pub timeout_secs: u64,
}

impl LarkConfig {
    /// Load Lark config from environment.
    ///
    /// `LARK_APP_ID` and `LARK_APP_SECRET` are mandatory; everything else has a default.
    pub fn from_env() -> LarkResult<Self> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            app_id: get_var("LARK_APP_ID")?,
            app_secret: get_var("LARK_APP_SECRET")?,
            base_url: get_var_or("LARK_BASE_URL", DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            verification_token: get_var_opt("LARK_VERIFICATION_TOKEN"),
            sync_window_days: parse_var_or("LARK_SYNC_WINDOW_DAYS", 7)?,
            page_size: parse_var_or::<u32>("LARK_PAGE_SIZE", 50)?.clamp(1, 100),
            max_pages: parse_var_or::<u32>("LARK_MAX_PAGES", 1000)?.max(1),
            write_batch_size: parse_var_or::<usize>("LARK_WRITE_BATCH_SIZE", 100)?.max(1),
            detail_batch_size: parse_var_or::<i64>("LARK_DETAIL_BATCH_SIZE", 5)?.max(1),
            user_batch_size: parse_var_or::<i64>("LARK_USER_BATCH_SIZE", 50)?.max(1),
            timeout_secs: parse_var_or("LARK_TIMEOUT_SECS", 30)?,
        })
    }

    /// Config pointing at `base_url` with test credentials and default tuning.
    pub fn for_base_url(base_url: &str) -> Self {
        Self {
            app_id: "cli_test".to_string(),
            app_secret: "secret".to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            verification_token: None,
            sync_window_days: 7,
            page_size: 50,
            max_pages: 1000,
            write_batch_size: 100,
            detail_batch_size: 5,
            user_batch_size: 50,
            timeout_secs: 5,
        }
    }
}
