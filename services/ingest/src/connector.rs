use async_trait::async_trait;
use serde::Serialize;

use crate::sync::SyncError;

/// Counters reported by one job run. Partial success is still `Ok`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub source: String,
    pub targets: usize,
    pub targets_failed: usize,
    pub fetched: usize,
    pub written: u64,
    pub unchanged: usize,
    pub skipped: usize,
    pub errors: usize,
    pub message: String,
}

impl SyncSummary {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Self::default()
        }
    }

    pub fn is_partial(&self) -> bool {
        self.targets_failed > 0 || self.errors > 0
    }
}

/// One sync job, triggered on demand.
///
/// Implementations do not lock: the caller must not start a second run of the
/// same job while one is in flight.
#[async_trait]
pub trait SyncJob: Send + Sync {
    fn source_name(&self) -> &'static str;
    async fn run(&self) -> Result<SyncSummary, SyncError>;
}

/// Pick the jobs named in `names`, in registration order. No names selects
/// every job; an unknown name is an error carrying that name.
pub fn select_jobs<'a>(
    jobs: &'a [Box<dyn SyncJob>],
    names: &[String],
) -> Result<Vec<&'a dyn SyncJob>, String> {
    if let Some(unknown) = names
        .iter()
        .find(|name| !jobs.iter().any(|job| job.source_name() == name.as_str()))
    {
        return Err(unknown.clone());
    }
    Ok(jobs
        .iter()
        .filter(|job| names.is_empty() || names.iter().any(|n| n == job.source_name()))
        .map(|job| job.as_ref())
        .collect())
}
