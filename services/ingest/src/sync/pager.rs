use chrono::{DateTime, Utc};

use super::SyncError;
use crate::lark::{AccessToken, LarkClient, RemoteInstance};

/// Outcome of walking the instance listing for one approval.
#[derive(Debug, Default)]
pub struct PageWalk {
    /// Valid records from every page that was fetched successfully.
    pub records: Vec<RemoteInstance>,
    /// Pages fetched successfully.
    pub pages: u32,
    /// Items dropped by validation.
    pub skipped: usize,
    /// Why pagination ended early, if it did.
    pub error: Option<SyncError>,
}

/// Follow the listing cursor for `approval_code` over `[start, end]`.
///
/// Continues only while a page says `has_more` *and* hands back a page token.
/// An empty page, a non-zero API code or any HTTP failure ends the walk; the
/// records of earlier pages are kept and the failure is returned in
/// [`PageWalk::error`]. Failed pages are not retried.
pub async fn walk_instance_pages(
    client: &LarkClient,
    token: &AccessToken,
    approval_code: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> PageWalk {
    let max_pages = client.config().max_pages;
    let mut walk = PageWalk::default();
    let mut page_token: Option<String> = None;

    loop {
        if walk.pages >= max_pages {
            tracing::warn!(approval_code, max_pages, "page limit reached, stopping");
            break;
        }
        let page_index = walk.pages + 1;

        let page = match client
            .list_instances_page(token, approval_code, start, end, page_token.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(
                    approval_code,
                    page = page_index,
                    kept = walk.records.len(),
                    error = %e,
                    "instance page fetch failed, keeping earlier pages"
                );
                walk.error = Some(SyncError::from_client(e));
                break;
            }
        };
        walk.pages += 1;

        if page.items.is_empty() {
            tracing::debug!(approval_code, page = page_index, "empty page, done");
            break;
        }

        for item in &page.items {
            match RemoteInstance::from_value(item) {
                Ok(record) => walk.records.push(record),
                Err(e) => {
                    tracing::warn!(
                        approval_code,
                        page = page_index,
                        record = %e.record,
                        reason = %e.reason,
                        "skipping malformed instance"
                    );
                    walk.skipped += 1;
                }
            }
        }

        match (page.has_more, page.page_token) {
            (true, Some(next)) => page_token = Some(next),
            (has_more, next) => {
                tracing::debug!(
                    approval_code,
                    page = page_index,
                    has_more,
                    has_token = next.is_some(),
                    "last page"
                );
                break;
            }
        }
    }

    walk
}
