//! Sweep events emitted by [`Sweeper`](super::Sweeper)
//!
//! These events are the interface between the sweep loop and whatever
//! presents it (console narration, tracing). Both receive the same events.

use crate::clear::ClearOutcome;
use stack_sweep_common::{ClearCandidate, RunMode};

/// Event emitted during a sweep
#[derive(Debug, Clone, PartialEq)]
pub enum SweepEvent {
    /// The sweep is about to discover stacks
    RunStarted { mode: RunMode },
    /// A stack matched the inclusion tags
    StackStarted { stack: String },
    /// A resource matched an exclusion tag and was left alone
    ResourceProtected {
        stack: String,
        candidate: ClearCandidate,
    },
    /// A resource was emptied (or would have been, in dry-run)
    ResourceCleared { stack: String, outcome: ClearOutcome },
    /// Reading tags of, or clearing, a resource failed
    ResourceFailed {
        stack: String,
        candidate: ClearCandidate,
        error: String,
    },
    /// A stack's resources could not be listed
    StackFailed { stack: String, error: String },
    /// Cancellation was observed; no further resource will be touched
    Cancelled,
    /// The sweep ended
    RunFinished {
        stacks: usize,
        items: u64,
        failures: usize,
    },
}
