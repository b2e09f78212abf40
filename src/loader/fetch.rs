//! Fetch requests and their results
//!
//! A `PendingFetch` is handed out by the tree when a node starts loading. It
//! owns everything needed to talk to the fetcher, so it can be awaited while
//! the tree stays usable, and fetches for different nodes can run side by
//! side. The resulting `FetchOutcome` is fed back through `LazyTree::apply`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Entity, FetchError, FetchResult};
use crate::repository::{ChildFetcher, ChildPage};

/// Why a fetch was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Full load of the root level; replaces the whole forest
    Load,
    /// First page of a node being expanded
    Expand,
    /// Next page of a node (or of the root level)
    LoadMore,
}

/// Result of applying an outcome (or of a one-shot operation)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Nothing to do: already expanded, already loading, or fully loaded
    Unchanged,
    /// Page merged; `added` nodes were attached
    Merged { added: usize },
    /// Result arrived for an older forest or a node that no longer exists
    Discarded,
}

/// A fetch that has been started but not yet run
pub struct PendingFetch<T: Entity> {
    pub(crate) parent_id: Option<T::Id>,
    pub(crate) offset: usize,
    pub(crate) page_size: usize,
    pub(crate) generation: u64,
    pub(crate) kind: FetchKind,
    pub(crate) timeout: Option<Duration>,
    pub(crate) fetcher: Arc<dyn ChildFetcher<T>>,
}

impl<T: Entity> fmt::Debug for PendingFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingFetch")
            .field("parent_id", &self.parent_id)
            .field("offset", &self.offset)
            .field("page_size", &self.page_size)
            .field("generation", &self.generation)
            .field("kind", &self.kind)
            .finish()
    }
}

impl<T: Entity> PendingFetch<T> {
    pub fn parent_id(&self) -> Option<T::Id> {
        self.parent_id
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn kind(&self) -> FetchKind {
        self.kind
    }

    /// Call the fetcher, reporting a timeout as a fetch error
    pub async fn run(self) -> FetchOutcome<T> {
        let request = self.fetcher.fetch(self.parent_id, self.offset, self.page_size);
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, request).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(limit.as_millis() as u64)),
            },
            None => request.await,
        };

        FetchOutcome {
            parent_id: self.parent_id,
            page_size: self.page_size,
            generation: self.generation,
            kind: self.kind,
            result,
        }
    }
}

/// A finished fetch, tagged with the node and forest generation it targets
#[derive(Debug)]
pub struct FetchOutcome<T: Entity> {
    pub(crate) parent_id: Option<T::Id>,
    pub(crate) page_size: usize,
    pub(crate) generation: u64,
    pub(crate) kind: FetchKind,
    pub(crate) result: FetchResult<ChildPage<T>>,
}

impl<T: Entity> FetchOutcome<T> {
    pub fn parent_id(&self) -> Option<T::Id> {
        self.parent_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}
