//! Forward-only traversal of paginated provider listings
//!
//! Every listing API used here hands back an opaque continuation token with
//! each page. [`PageCursor`] drives such an API as an explicit loop: it
//! requests the first page without a token, then each issued token exactly
//! once, and stops when no token comes back. A provider that repeats a token
//! is treated as a logic error rather than followed into a cycle.

use crate::error::ProviderLogicError;
use anyhow::Result;
use std::collections::HashSet;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;

/// One page of a listing plus the token for the next page, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T, C = String> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

impl<T, C> Page<T, C> {
    pub fn new(items: Vec<T>, next: Option<C>) -> Self {
        Self { items, next }
    }

    /// A final page (no continuation)
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

enum CursorState<C> {
    Start,
    Next(C),
    Done,
}

/// Cursor over a paginated listing, keyed by continuation token type `C`.
pub struct PageCursor<C> {
    state: CursorState<C>,
    issued: HashSet<C>,
    pages: usize,
}

impl<C> Default for PageCursor<C>
where
    C: Clone + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C> PageCursor<C>
where
    C: Clone + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self {
            state: CursorState::Start,
            issued: HashSet::new(),
            pages: 0,
        }
    }

    /// Whether the listing has been fully consumed
    pub fn is_done(&self) -> bool {
        matches!(self.state, CursorState::Done)
    }

    /// Number of pages fetched so far
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Fetch the next page with `fetch`, or return `None` once exhausted.
    ///
    /// `fetch` receives `None` for the first page and the previously issued
    /// token afterwards. On error the cursor is left where it was.
    pub async fn next_page<T, F, Fut>(&mut self, fetch: F) -> Result<Option<Vec<T>>>
    where
        F: FnOnce(Option<C>) -> Fut,
        Fut: Future<Output = Result<Page<T, C>>>,
    {
        let token = match &self.state {
            CursorState::Done => return Ok(None),
            CursorState::Start => None,
            CursorState::Next(token) => Some(token.clone()),
        };

        let page = fetch(token).await?;
        self.pages += 1;

        self.state = match page.next {
            Some(next) => {
                if !self.issued.insert(next.clone()) {
                    return Err(ProviderLogicError::RepeatedContinuationToken {
                        token: format!("{next:?}"),
                    }
                    .into());
                }
                CursorState::Next(next)
            }
            None => CursorState::Done,
        };

        Ok(Some(page.items))
    }
}

/// Drain every page of a listing into one vector.
pub async fn collect_pages<T, C, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    C: Clone + Eq + Hash + Debug,
    F: FnMut(Option<C>) -> Fut,
    Fut: Future<Output = Result<Page<T, C>>>,
{
    let mut cursor = PageCursor::new();
    let mut items = Vec::new();
    while let Some(page) = cursor.next_page(&mut fetch).await? {
        items.extend(page);
    }
    Ok(items)
}
