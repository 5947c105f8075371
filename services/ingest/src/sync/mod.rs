//! Incremental sync engine shared by every job.
//!
//! A run walks `resolve resume point → fetch pages → write`, one target at a
//! time. Nothing here locks: callers must make sure at most one run per job
//! and target is in flight (e.g. a single scheduler trigger).

pub mod error;
pub mod gate;
pub mod pager;
pub mod resume;
pub mod writer;

pub use error::SyncError;
pub use gate::profile_changed;
pub use pager::{walk_instance_pages, PageWalk};
pub use resume::resolve_start;
pub use writer::{write_chunked, WriteOutcome};
