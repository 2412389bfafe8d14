//! Stack discovery: paginated stack listing filtered by inclusion tags
//!
//! [`StackDiscovery`] is a pull-based sequence. A page of stacks is fetched
//! only when every matching stack of the previous page has been handed out,
//! so a caller that stops early never pays for the rest of the listing.

use crate::aws::StackOperations;
use crate::pagination::PageCursor;
use anyhow::Result;
use stack_sweep_common::{InclusionFilter, TagSet};
use std::collections::VecDeque;
use tracing::debug;

/// A stack as seen by discovery: its name and its own tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDescriptor {
    pub name: String,
    pub tags: TagSet,
}

impl StackDescriptor {
    pub fn new(name: impl Into<String>, tags: TagSet) -> Self {
        Self {
            name: name.into(),
            tags,
        }
    }
}

/// Lazily yields the stacks whose tags contain every inclusion token,
/// in provider order.
pub struct StackDiscovery<'a, S> {
    stacks: &'a S,
    include: &'a InclusionFilter,
    cursor: PageCursor<String>,
    buffer: VecDeque<StackDescriptor>,
    examined: usize,
}

impl<'a, S: StackOperations> StackDiscovery<'a, S> {
    pub fn new(stacks: &'a S, include: &'a InclusionFilter) -> Self {
        Self {
            stacks,
            include,
            cursor: PageCursor::new(),
            buffer: VecDeque::new(),
            examined: 0,
        }
    }

    /// Next matching stack, or `None` when the listing is exhausted.
    pub async fn next_stack(&mut self) -> Result<Option<StackDescriptor>> {
        loop {
            if let Some(stack) = self.buffer.pop_front() {
                return Ok(Some(stack));
            }

            let stacks = self.stacks;
            let Some(page) = self
                .cursor
                .next_page(move |token| stacks.describe_stacks(token))
                .await?
            else {
                debug!(
                    examined = self.examined,
                    pages = self.cursor.pages(),
                    "Stack listing exhausted"
                );
                return Ok(None);
            };

            self.examined += page.len();
            for stack in page {
                if self.include.accepts(&stack.tags) {
                    self.buffer.push_back(stack);
                } else {
                    debug!(stack = %stack.name, "Stack does not match inclusion tags");
                }
            }
        }
    }

    /// Number of stacks examined so far, matching or not.
    pub fn examined(&self) -> usize {
        self.examined
    }

    /// Drain the whole sequence.
    pub async fn collect_all(mut self) -> Result<Vec<StackDescriptor>> {
        let mut stacks = Vec::new();
        while let Some(stack) = self.next_stack().await? {
            stacks.push(stack);
        }
        Ok(stacks)
    }
}
