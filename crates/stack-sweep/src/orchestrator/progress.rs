//! Progress reporting for the sweep
//!
//! Provides the [`SweepReporter`] trait and two implementations: operator
//! narration on a writer (stdout by default) and structured tracing events.

use super::events::SweepEvent;
use stack_sweep_common::RunMode;
use std::io::Write;
use std::sync::Mutex;
use tracing::{info, warn};

/// Receives every [`SweepEvent`] in order
pub trait SweepReporter: Send + Sync {
    fn report(&self, event: &SweepEvent);
}

const STACK_RULE: &str = "######################################";

/// Human narration: one header per stack, one line per resource.
pub struct ConsoleReporter<W> {
    out: Mutex<W>,
}

impl ConsoleReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn render(event: &SweepEvent) -> Option<String> {
        let line = match event {
            SweepEvent::RunStarted { mode } => match mode {
                RunMode::DryRun => "Running in dry-run mode - Nothing will be removed".to_string(),
                RunMode::Execute => "Removing data from:".to_string(),
            },
            SweepEvent::StackStarted { stack } => {
                format!("\n{STACK_RULE}\nStack: {stack}\nResources:")
            }
            SweepEvent::ResourceCleared { outcome, .. } => {
                let verb = match outcome.mode {
                    RunMode::DryRun => "would delete",
                    RunMode::Execute => "deleted",
                };
                format!(
                    "└─{}: {} ({verb} {} item{})",
                    outcome.candidate.kind.label(),
                    outcome.candidate.physical_id,
                    outcome.items,
                    if outcome.items == 1 { "" } else { "s" }
                )
            }
            SweepEvent::ResourceProtected { candidate, .. } => format!(
                "└─{}: {} (protected, skipped)",
                candidate.kind.label(),
                candidate.physical_id
            ),
            SweepEvent::ResourceFailed {
                candidate, error, ..
            } => format!(
                "└─{}: {} (FAILED: {error})",
                candidate.kind.label(),
                candidate.physical_id
            ),
            SweepEvent::StackFailed { error, .. } => format!("└─FAILED: {error}"),
            SweepEvent::Cancelled => "\nCancelled - remaining resources were not touched".to_string(),
            SweepEvent::RunFinished { .. } => return None,
        };
        Some(line)
    }
}

impl<W: Write + Send> SweepReporter for ConsoleReporter<W> {
    fn report(&self, event: &SweepEvent) {
        let Some(line) = Self::render(event) else {
            return;
        };
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Narration is best effort; a closed stdout must not abort the sweep
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

/// Reporter that writes tracing events (for `--format json`, where stdout is
/// reserved for the report)
pub struct LogReporter;

impl LogReporter {
    /// Create a new log reporter
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepReporter for LogReporter {
    fn report(&self, event: &SweepEvent) {
        match event {
            SweepEvent::RunStarted { mode } => info!(mode = %mode, "Sweep started"),
            SweepEvent::StackStarted { stack } => info!(stack = %stack, "Sweeping stack"),
            SweepEvent::ResourceProtected { stack, candidate } => info!(
                stack = %stack,
                kind = %candidate.kind,
                resource = %candidate.physical_id,
                "Resource protected by exclusion tags"
            ),
            SweepEvent::ResourceCleared { stack, outcome } => info!(
                stack = %stack,
                kind = %outcome.candidate.kind,
                resource = %outcome.candidate.physical_id,
                items = outcome.items,
                mode = %outcome.mode,
                "Resource cleared"
            ),
            SweepEvent::ResourceFailed {
                stack,
                candidate,
                error,
            } => warn!(
                stack = %stack,
                kind = %candidate.kind,
                resource = %candidate.physical_id,
                error = %error,
                "Resource failed"
            ),
            SweepEvent::StackFailed { stack, error } => {
                warn!(stack = %stack, error = %error, "Stack failed")
            }
            SweepEvent::Cancelled => warn!("Sweep cancelled"),
            SweepEvent::RunFinished {
                stacks,
                items,
                failures,
            } => info!(stacks, items, failures, "Sweep finished"),
        }
    }
}
