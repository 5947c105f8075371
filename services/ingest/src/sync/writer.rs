use std::collections::HashMap;

use chrono::{DateTime, Utc};
use lark_db::approvals::models::{ConflictPolicy, NewApprovalInstance};
use lark_db::approvals::repositories::ApprovalRepository;

/// Result of a chunked write.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Rows the store reports as inserted or updated.
    pub written: u64,
    pub chunks: usize,
    pub failed_chunks: usize,
    pub failed_rows: usize,
}

/// Write `rows` in chunks of `batch_size`, keyed by `instance_code`.
///
/// Duplicate codes within the input collapse to their last occurrence so a
/// single statement never touches the same row twice. A failing chunk is
/// logged and counted; the remaining chunks are still written. An empty
/// input makes no store call.
pub async fn write_chunked<R>(
    repo: &R,
    approval_code: &str,
    rows: Vec<NewApprovalInstance>,
    batch_size: usize,
    policy: ConflictPolicy,
    now: DateTime<Utc>,
) -> WriteOutcome
where
    R: ApprovalRepository + ?Sized,
{
    let mut outcome = WriteOutcome::default();
    if rows.is_empty() {
        return outcome;
    }

    let rows = dedupe_by_code(rows);
    for (index, chunk) in rows.chunks(batch_size.max(1)).enumerate() {
        outcome.chunks += 1;
        match repo.upsert_instances(chunk, policy, now).await {
            Ok(affected) => outcome.written += affected,
            Err(e) => {
                tracing::error!(
                    approval_code,
                    chunk = index,
                    size = chunk.len(),
                    policy = policy.as_str(),
                    error = %e,
                    "instance chunk write failed"
                );
                outcome.failed_chunks += 1;
                outcome.failed_rows += chunk.len();
            }
        }
    }

    outcome
}

fn dedupe_by_code(rows: Vec<NewApprovalInstance>) -> Vec<NewApprovalInstance> {
    let mut position: HashMap<String, usize> = HashMap::with_capacity(rows.len());
    let mut unique: Vec<NewApprovalInstance> = Vec::with_capacity(rows.len());
    for row in rows {
        match position.get(&row.instance_code) {
            Some(&i) => unique[i] = row,
            None => {
                position.insert(row.instance_code.clone(), unique.len());
                unique.push(row);
            }
        }
    }
    unique
}
