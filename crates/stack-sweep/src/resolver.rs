//! Resource resolution: from a stack to its clear candidates
//!
//! The resolver lists a stack's resources once, keeps buckets and tables,
//! and then checks each candidate's own tags against the exclusion filter,
//! one candidate at a time as the caller asks for it.

use crate::aws::{BucketOperations, StackOperations, TableOperations};
use crate::discovery::StackDescriptor;
use crate::pagination::collect_pages;
use anyhow::{Context, Result};
use stack_sweep_common::{ClearCandidate, ExclusionFilter, ResourceKind, TagSet};
use std::collections::VecDeque;
use tracing::debug;

/// Outcome of the exclusion check for one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No exclusion token matched: clear its contents
    Clear(ClearCandidate),
    /// At least one exclusion token matched: leave it alone
    Protected(ClearCandidate),
}

/// Resolves stacks into candidates using the stack, bucket and table APIs.
pub struct ResourceResolver<'a, S, B, T> {
    stacks: &'a S,
    buckets: &'a B,
    tables: &'a T,
    exclude: &'a ExclusionFilter,
}

impl<'a, S, B, T> ResourceResolver<'a, S, B, T>
where
    S: StackOperations,
    B: BucketOperations,
    T: TableOperations,
{
    pub fn new(stacks: &'a S, buckets: &'a B, tables: &'a T, exclude: &'a ExclusionFilter) -> Self {
        Self {
            stacks,
            buckets,
            tables,
            exclude,
        }
    }

    /// List the stack's resources and order its candidates: buckets first,
    /// then tables, each in resource-list order.
    pub async fn resolve(&self, stack: &StackDescriptor) -> Result<StackCandidates<'a, B, T>> {
        let resources = self.stacks.describe_stack_resources(&stack.name).await?;

        let mut pending = Vec::new();
        let mut ignored = 0usize;
        for resource in resources {
            if resource.kind.is_clearable() {
                pending.push(ClearCandidate {
                    kind: resource.kind,
                    physical_id: resource.physical_id,
                });
            } else {
                ignored += 1;
            }
        }
        // Stable: resource-list order is kept within a kind
        pending.sort_by_key(|c| c.kind.clear_priority());

        debug!(
            stack = %stack.name,
            candidates = pending.len(),
            ignored,
            "Resolved stack resources"
        );

        Ok(StackCandidates {
            buckets: self.buckets,
            tables: self.tables,
            exclude: self.exclude,
            pending: pending.into(),
            current: None,
            ignored,
        })
    }
}

/// The candidates of one stack, checked against the exclusion filter lazily.
pub struct StackCandidates<'a, B, T> {
    buckets: &'a B,
    tables: &'a T,
    exclude: &'a ExclusionFilter,
    pending: VecDeque<ClearCandidate>,
    current: Option<ClearCandidate>,
    ignored: usize,
}

impl<B, T> StackCandidates<'_, B, T>
where
    B: BucketOperations,
    T: TableOperations,
{
    /// Fetch the next candidate's tags and decide whether it is protected.
    ///
    /// On error, [`current`](Self::current) names the candidate whose tags
    /// could not be read; the sequence can still be advanced past it.
    pub async fn next(&mut self) -> Result<Option<Resolution>> {
        let Some(candidate) = self.pending.pop_front() else {
            self.current = None;
            return Ok(None);
        };
        self.current = Some(candidate.clone());

        let tags = self
            .resource_tags(&candidate)
            .await
            .with_context(|| format!("Failed to read tags of {candidate}"))?;

        if self.exclude.protects(&tags) {
            debug!(resource = %candidate, tags = %tags, "Resource matches exclusion tags");
            Ok(Some(Resolution::Protected(candidate)))
        } else {
            Ok(Some(Resolution::Clear(candidate)))
        }
    }

    /// The candidate most recently taken by [`next`](Self::next)
    pub fn current(&self) -> Option<&ClearCandidate> {
        self.current.as_ref()
    }

    /// Candidates not yet taken
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Resources of other kinds that were dropped
    pub fn ignored(&self) -> usize {
        self.ignored
    }

    async fn resource_tags(&self, candidate: &ClearCandidate) -> Result<TagSet> {
        match candidate.kind {
            ResourceKind::Bucket => {
                let tags = self.buckets.bucket_tags(&candidate.physical_id).await?;
                Ok(TagSet::from_tags(&tags))
            }
            ResourceKind::Table => {
                let tables = self.tables;
                let info = tables.describe_table(&candidate.physical_id).await?;
                let arn = info.arn;
                let tags = collect_pages(|token| tables.list_tags(&arn, token)).await?;
                Ok(TagSet::from_tags(&tags))
            }
            ResourceKind::Other(_) => Ok(TagSet::empty()),
        }
    }
}
