//! Run summary: what was cleared, protected and failed

use crate::clear::ClearOutcome;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;
use stack_sweep_common::{ClearCandidate, ResourceKind, RunMode};

/// A failure recorded under `--continue-on-error`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    /// `None` when the stack's resource list itself could not be read
    pub resource: Option<ClearCandidate>,
    pub error: String,
}

/// Everything that happened to one stack
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackReport {
    pub name: String,
    pub cleared: Vec<ClearOutcome>,
    pub protected: Vec<ClearCandidate>,
    pub failures: Vec<FailureRecord>,
}

impl StackReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cleared: Vec::new(),
            protected: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn items(&self) -> u64 {
        self.cleared.iter().map(|o| o.items).sum()
    }

    fn cleared_of(&self, kind: &ResourceKind) -> usize {
        self.cleared
            .iter()
            .filter(|o| &o.candidate.kind == kind)
            .count()
    }
}

/// Summary of one sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub cancelled: bool,
    pub stacks: Vec<StackReport>,
}

impl SweepReport {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            started_at: Utc::now(),
            finished_at: None,
            cancelled: false,
            stacks: Vec::new(),
        }
    }

    /// Start recording a new stack and return it
    pub fn begin_stack(&mut self, name: &str) -> &mut StackReport {
        self.stacks.push(StackReport::new(name));
        let last = self.stacks.len() - 1;
        &mut self.stacks[last]
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn stacks_matched(&self) -> usize {
        self.stacks.len()
    }

    pub fn buckets_cleared(&self) -> usize {
        self.stacks
            .iter()
            .map(|s| s.cleared_of(&ResourceKind::Bucket))
            .sum()
    }

    pub fn tables_cleared(&self) -> usize {
        self.stacks
            .iter()
            .map(|s| s.cleared_of(&ResourceKind::Table))
            .sum()
    }

    pub fn items(&self) -> u64 {
        self.stacks.iter().map(StackReport::items).sum()
    }

    pub fn protected_count(&self) -> usize {
        self.stacks.iter().map(|s| s.protected.len()).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.stacks.iter().map(|s| s.failures.len()).sum()
    }

    /// Completed without cancellation and without recorded failures
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.failure_count() == 0
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize sweep report")
    }

    /// Per-stack summary table
    pub fn summary_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Stack"),
                Cell::new("Buckets"),
                Cell::new("Tables"),
                Cell::new("Items"),
                Cell::new("Protected"),
                Cell::new("Failures"),
            ]);

        for stack in &self.stacks {
            table.add_row(vec![
                Cell::new(&stack.name),
                Cell::new(stack.cleared_of(&ResourceKind::Bucket)),
                Cell::new(stack.cleared_of(&ResourceKind::Table)),
                Cell::new(stack.items()),
                Cell::new(stack.protected.len()),
                Cell::new(stack.failures.len()),
            ]);
        }

        table
    }

    /// Print the summary table and any failures to stdout
    pub fn print_summary(&self) {
        let heading = match self.mode {
            RunMode::DryRun => "Sweep Summary (dry run, nothing was deleted)",
            RunMode::Execute => "Sweep Summary",
        };
        println!("\n=== {heading} ===\n");

        if self.stacks.is_empty() {
            println!("No stacks matched the inclusion tags.");
        } else {
            println!("{}", self.summary_table());
        }

        for stack in &self.stacks {
            for failure in &stack.failures {
                match &failure.resource {
                    Some(resource) => {
                        println!("  ✗ {} / {}: {}", stack.name, resource, failure.error)
                    }
                    None => println!("  ✗ {}: {}", stack.name, failure.error),
                }
            }
        }

        if self.cancelled {
            println!("\nRun was cancelled before all resources were processed.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SweepReport {
        let mut report = SweepReport::new(RunMode::Execute);
        let app = report.begin_stack("app");
        app.cleared.push(ClearOutcome::new(
            ClearCandidate::bucket("b1"),
            3,
            RunMode::Execute,
        ));
        app.cleared.push(ClearOutcome::new(
            ClearCandidate::table("t1"),
            2,
            RunMode::Execute,
        ));
        app.protected.push(ClearCandidate::bucket("b2"));
        report.begin_stack("other");
        report
    }

    #[test]
    fn test_totals() {
        let report = sample();
        assert_eq!(report.stacks_matched(), 2);
        assert_eq!(report.buckets_cleared(), 1);
        assert_eq!(report.tables_cleared(), 1);
        assert_eq!(report.items(), 5);
        assert_eq!(report.protected_count(), 1);
        assert!(report.is_success());
    }

    #[test]
    fn test_failures_and_cancellation_are_not_success() {
        let mut report = sample();
        report.stacks[1].failures.push(FailureRecord {
            resource: None,
            error: "Failed to describe resources".into(),
        });
        assert!(!report.is_success());

        let mut cancelled = sample();
        cancelled.cancelled = true;
        assert!(!cancelled.is_success());
    }

    #[test]
    fn test_json_shape() {
        let mut report = sample();
        report.finish();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["mode"], "execute");
        assert_eq!(json["cancelled"], false);
        assert_eq!(json["stacks"][0]["name"], "app");
        assert_eq!(json["stacks"][0]["cleared"][0]["candidate"]["kind"], "bucket");
        assert_eq!(json["stacks"][0]["cleared"][0]["items"], 3);
        assert!(json["finished_at"].is_string());
    }

    #[test]
    fn test_summary_table_has_row_per_stack() {
        let rendered = sample().summary_table().to_string();
        assert!(rendered.contains("app"));
        assert!(rendered.contains("other"));
        assert!(rendered.contains("Protected"));
    }
}
