//! Sweep orchestration
//!
//! The [`Sweeper`] drives one run: discover matching stacks, resolve each
//! stack's candidates, and clear them, buckets before tables. Everything is
//! sequential; progress goes out as [`SweepEvent`]s and the outcome is
//! collected into a [`SweepReport`].

pub mod events;
pub mod progress;
pub mod report;

pub use events::SweepEvent;
pub use progress::{ConsoleReporter, LogReporter, SweepReporter};
pub use report::{FailureRecord, StackReport, SweepReport};

use crate::aws::{BucketOperations, StackOperations, TableOperations};
use crate::clear::{BucketClearer, ClearOutcome, TableClearer};
use crate::config::{FailurePolicy, SweepConfig};
use crate::discovery::{StackDescriptor, StackDiscovery};
use crate::resolver::{Resolution, ResourceResolver};
use anyhow::{Context, Result, bail};
use stack_sweep_common::{ClearCandidate, ResourceKind, RunMode};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Whether the sweep should go on after a stack
enum Flow {
    Continue,
    Cancelled,
}

/// Per-run state shared by every stack of one sweep
struct RunContext<'r, 'a, B, T> {
    mode: RunMode,
    policy: FailurePolicy,
    buckets: BucketClearer<'a, B>,
    tables: TableClearer<'a, T>,
    report: &'r mut SweepReport,
}

/// Runs a sweep against a set of provider operations.
pub struct Sweeper<'a, S, B, T> {
    stacks: &'a S,
    buckets: &'a B,
    tables: &'a T,
    reporter: &'a dyn SweepReporter,
    cancel: CancellationToken,
}

impl<'a, S, B, T> Sweeper<'a, S, B, T>
where
    S: StackOperations,
    B: BucketOperations,
    T: TableOperations,
{
    pub fn new(
        stacks: &'a S,
        buckets: &'a B,
        tables: &'a T,
        reporter: &'a dyn SweepReporter,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            stacks,
            buckets,
            tables,
            reporter,
            cancel,
        }
    }

    /// Run the whole sweep.
    ///
    /// Returns `Err` on invalid configuration (before any provider call) and,
    /// under [`FailurePolicy::FailFast`], on the first failure. A cancelled
    /// run returns `Ok` with [`SweepReport::cancelled`] set.
    pub async fn run(&self, config: &SweepConfig) -> Result<SweepReport> {
        config.validate()?;

        let include = config.filters.inclusion();
        let exclude = config.filters.exclusion();
        let settings = config.clear_settings();
        let mode = config.mode();

        info!(
            include = %include.tokens(),
            exclude = %exclude.tokens(),
            mode = %mode,
            policy = %config.failure_policy(),
            "Starting sweep"
        );

        let mut report = SweepReport::new(mode);
        self.reporter.report(&SweepEvent::RunStarted { mode });

        let mut discovery = StackDiscovery::new(self.stacks, &include);
        let resolver = ResourceResolver::new(self.stacks, self.buckets, self.tables, &exclude);
        let mut run = RunContext {
            mode,
            policy: config.failure_policy(),
            buckets: BucketClearer::new(self.buckets, &settings),
            tables: TableClearer::new(self.tables, &settings),
            report: &mut report,
        };

        loop {
            if self.cancel.is_cancelled() {
                self.cancelled(run.report);
                break;
            }

            let Some(stack) = discovery.next_stack().await? else {
                break;
            };

            match self.sweep_stack(&stack, &resolver, &mut run).await? {
                Flow::Continue => {}
                Flow::Cancelled => {
                    self.cancelled(run.report);
                    break;
                }
            }
        }

        report.finish();
        self.reporter.report(&SweepEvent::RunFinished {
            stacks: report.stacks_matched(),
            items: report.items(),
            failures: report.failure_count(),
        });
        info!(
            stacks = report.stacks_matched(),
            examined = discovery.examined(),
            buckets = report.buckets_cleared(),
            tables = report.tables_cleared(),
            items = report.items(),
            protected = report.protected_count(),
            failures = report.failure_count(),
            cancelled = report.cancelled,
            "Sweep finished"
        );

        Ok(report)
    }

    async fn sweep_stack(
        &self,
        stack: &StackDescriptor,
        resolver: &ResourceResolver<'_, S, B, T>,
        run: &mut RunContext<'_, '_, B, T>,
    ) -> Result<Flow> {
        let name = stack.name.as_str();
        self.reporter.report(&SweepEvent::StackStarted {
            stack: name.to_string(),
        });
        run.report.begin_stack(name);

        let mut candidates = match resolver.resolve(stack).await {
            Ok(candidates) => candidates,
            Err(e) => {
                let error = format!("{e:#}");
                warn!(stack = %name, error = %error, "Failed to resolve stack resources");
                self.reporter.report(&SweepEvent::StackFailed {
                    stack: name.to_string(),
                    error: error.clone(),
                });
                if run.policy == FailurePolicy::FailFast {
                    return Err(e);
                }
                Self::current_stack(run.report).failures.push(FailureRecord {
                    resource: None,
                    error,
                });
                return Ok(Flow::Continue);
            }
        };
        info!(
            stack = %name,
            candidates = candidates.remaining(),
            ignored = candidates.ignored(),
            "Sweeping stack"
        );

        loop {
            if self.cancel.is_cancelled() {
                return Ok(Flow::Cancelled);
            }

            let next = candidates.next().await;
            let resolution = match next {
                Ok(Some(resolution)) => resolution,
                Ok(None) => break,
                Err(e) => {
                    let Some(candidate) = candidates.current().cloned() else {
                        return Err(e);
                    };
                    self.record_failure(name, candidate, e, run)?;
                    continue;
                }
            };

            match resolution {
                Resolution::Protected(candidate) => {
                    self.reporter.report(&SweepEvent::ResourceProtected {
                        stack: name.to_string(),
                        candidate: candidate.clone(),
                    });
                    Self::current_stack(run.report).protected.push(candidate);
                }
                Resolution::Clear(candidate) => {
                    let result = Self::clear(&candidate, run).await;
                    match result {
                        Ok(outcome) => {
                            self.reporter.report(&SweepEvent::ResourceCleared {
                                stack: name.to_string(),
                                outcome: outcome.clone(),
                            });
                            Self::current_stack(run.report).cleared.push(outcome);
                        }
                        Err(e) => self.record_failure(name, candidate, e, run)?,
                    }
                }
            }
        }

        Ok(Flow::Continue)
    }

    async fn clear(
        candidate: &ClearCandidate,
        run: &RunContext<'_, '_, B, T>,
    ) -> Result<ClearOutcome> {
        let id = candidate.physical_id.as_str();
        match &candidate.kind {
            ResourceKind::Bucket => run
                .buckets
                .clear(id, run.mode)
                .await
                .with_context(|| format!("Failed to clear bucket '{id}'")),
            ResourceKind::Table => run
                .tables
                .clear(id, run.mode)
                .await
                .with_context(|| format!("Failed to clear table '{id}'")),
            ResourceKind::Other(kind) => bail!("Resources of type {kind} are never cleared"),
        }
    }

    /// Report the failure, then either fail fast or record it and keep going
    fn record_failure(
        &self,
        stack: &str,
        candidate: ClearCandidate,
        error: anyhow::Error,
        run: &mut RunContext<'_, '_, B, T>,
    ) -> Result<()> {
        let message = format!("{error:#}");
        warn!(stack = %stack, resource = %candidate, error = %message, policy = %run.policy, "Resource failed");
        self.reporter.report(&SweepEvent::ResourceFailed {
            stack: stack.to_string(),
            candidate: candidate.clone(),
            error: message.clone(),
        });

        if run.policy == FailurePolicy::FailFast {
            return Err(error.context(format!("Sweep of stack '{stack}' aborted")));
        }

        Self::current_stack(run.report)
            .failures
            .push(FailureRecord {
                resource: Some(candidate),
                error: message,
            });
        Ok(())
    }

    fn current_stack(report: &mut SweepReport) -> &mut StackReport {
        let last = report.stacks.len() - 1;
        &mut report.stacks[last]
    }

    fn cancelled(&self, report: &mut SweepReport) {
        warn!("Cancellation requested, stopping before the next resource");
        report.cancelled = true;
        self.reporter.report(&SweepEvent::Cancelled);
    }
}
