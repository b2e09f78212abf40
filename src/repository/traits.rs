//! Repository Layer - Core Traits
//!
//! Defines the abstract interface the tree uses to fetch children.
//! Implementations can talk to a server, a database, in-memory data, etc.

use async_trait::async_trait;

use crate::domain::{Entity, FetchResult, SourceItem};

/// One page of children as returned by the source
#[derive(Debug, Clone)]
pub struct ChildPage<T> {
    /// At most `page_size` items, each attributable to the requested parent
    pub items: Vec<SourceItem<T>>,
    /// Fresh direct-child count of the parent, if the source reports one
    pub total_count: Option<usize>,
}

impl<T> ChildPage<T> {
    pub fn new(items: Vec<SourceItem<T>>) -> Self {
        Self {
            items,
            total_count: None,
        }
    }

    pub fn with_total(mut self, total: usize) -> Self {
        self.total_count = Some(total);
        self
    }
}

/// Source of child pages
///
/// `parent_id = None` addresses the root level (initial / full load).
/// Re-fetching the same offset after a failure must return a consistent page.
#[async_trait]
pub trait ChildFetcher<T: Entity>: Send + Sync {
    async fn fetch(
        &self,
        parent_id: Option<T::Id>,
        offset: usize,
        page_size: usize,
    ) -> FetchResult<ChildPage<T>>;
}
