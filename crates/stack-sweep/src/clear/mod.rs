//! Clearing the contents of buckets and tables
//!
//! Clearers enumerate every item of one resource and delete it in provider
//! sized batches. In [`RunMode::DryRun`] they still enumerate, so the outcome
//! says how much would go, but never issue a mutating call.

mod bucket;
mod table;

pub use bucket::BucketClearer;
pub use table::TableClearer;

use crate::aws::RetryPolicy;
use serde::Serialize;
use stack_sweep_common::defaults::DEFAULT_UNPROCESSED_RETRIES;
use stack_sweep_common::{ClearCandidate, RunMode};

/// Knobs shared by the clearers
#[derive(Debug, Clone)]
pub struct ClearSettings {
    /// Delete every object version and delete marker, not only current objects
    pub include_versions: bool,
    /// Resends of unprocessed batch deletes before giving up
    pub unprocessed_retries: u32,
    /// Delays between resends of unprocessed batch deletes
    pub unprocessed_backoff: RetryPolicy,
}

impl Default for ClearSettings {
    fn default() -> Self {
        Self {
            include_versions: false,
            unprocessed_retries: DEFAULT_UNPROCESSED_RETRIES,
            unprocessed_backoff: RetryPolicy::with_max_attempts(DEFAULT_UNPROCESSED_RETRIES + 1),
        }
    }
}

/// What a clear did (or, in dry-run, would have done)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearOutcome {
    pub candidate: ClearCandidate,
    /// Items deleted, or items that would be deleted in dry-run
    pub items: u64,
    pub mode: RunMode,
}

impl ClearOutcome {
    pub fn new(candidate: ClearCandidate, items: u64, mode: RunMode) -> Self {
        Self {
            candidate,
            items,
            mode,
        }
    }
}
