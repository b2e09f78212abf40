//! Lazy Load Coordinator
//!
//! `LazyTree` owns a forest together with the fetcher that fills it. Every
//! node goes `Collapsed -> Expanding -> Expanded` on its first expand, and
//! independently `Idle -> Loading -> Idle` for each further page.
//!
//! Invariants enforced here:
//! - **Single flight**: a node (or the root level) has at most one fetch
//!   outstanding; starting another while `loading` is set is a no-op.
//! - **Bounded materialization**: `children.len() <= total` after every
//!   merge; pages are capped at the configured page size.
//! - **No duplicates**: fetched items whose id is already in the forest are
//!   dropped.
//! - **Generations**: a full rebuild bumps the generation; results tagged
//!   with an older generation are discarded on arrival.
//!
//! Mutation happens only through `&mut self`. The `begin_*` methods flip
//! the flags synchronously and hand back a `PendingFetch`, which is the only
//! part that suspends.

mod fetch;

#[cfg(test)]
mod tests;

pub use fetch::{Applied, FetchKind, FetchOutcome, PendingFetch};

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::TreeConfig;
use crate::domain::{ChildList, Entity, FetchError, Node, Row, SourceItem, TreeError, TreeResult};
use crate::forest::Forest;
use crate::hierarchy::{build_forest, build_subtree};
use crate::mutation;
use crate::repository::{ChildFetcher, ChildPage};
use crate::tree::{self, collect_ids};

pub struct LazyTree<T: Entity> {
    forest: Forest<T>,
    fetcher: Arc<dyn ChildFetcher<T>>,
    config: TreeConfig,
    generation: u64,
}

fn label<T: Entity>(parent: Option<T::Id>) -> String {
    match parent {
        Some(id) => format!("{:?}", id),
        None => "root level".to_string(),
    }
}

impl<T: Entity> LazyTree<T> {
    pub fn new(fetcher: Arc<dyn ChildFetcher<T>>, config: TreeConfig) -> Self {
        Self {
            forest: Forest::new(),
            fetcher,
            config: config.validated(),
            generation: 0,
        }
    }

    pub fn forest(&self) -> &Forest<T> {
        &self.forest
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, id: T::Id) -> Option<&Node<T>> {
        self.forest.get(id)
    }

    /// Render-ready rows for the current state
    pub fn rows(&self) -> Vec<Row<'_, T>> {
        tree::project(&self.forest)
    }

    /// Replace the forest with one built from `items`
    ///
    /// Fails atomically on malformed input; the old forest is kept.
    pub fn rebuild(&mut self, items: Vec<SourceItem<T>>) -> TreeResult<()> {
        let forest = build_forest(items)?;
        self.replace_forest(forest);
        Ok(())
    }

    /// Drop the forest; results of fetches still in flight will be discarded
    pub fn clear(&mut self) {
        self.replace_forest(Forest::new());
    }

    fn replace_forest(&mut self, forest: Forest<T>) {
        self.forest = forest;
        self.generation += 1;
        log::info!(
            "Forest rebuilt: {} root(s), {} node(s), generation {}",
            self.forest.roots().len(),
            self.forest.len(),
            self.generation
        );
    }

    fn pending(
        &self,
        parent_id: Option<T::Id>,
        offset: usize,
        page_size: usize,
        kind: FetchKind,
    ) -> PendingFetch<T> {
        PendingFetch {
            parent_id,
            offset,
            page_size,
            generation: self.generation,
            kind,
            timeout: self.config.fetch_timeout(),
            fetcher: Arc::clone(&self.fetcher),
        }
    }

    // Starting fetches

    /// Start the initial (or a refreshing) load of the root level
    pub fn begin_load(&mut self) -> Option<PendingFetch<T>> {
        if !start_loading(&mut self.forest.roots) {
            log::debug!("Root level already loading, ignoring load");
            return None;
        }
        Some(self.pending(None, 0, self.config.root_page_size, FetchKind::Load))
    }

    /// Expand a node; fetches its first page if nothing is materialized yet
    pub fn begin_expand(&mut self, id: T::Id) -> TreeResult<Option<PendingFetch<T>>> {
        let node = self
            .forest
            .get_mut(id)
            .ok_or_else(|| TreeError::NodeNotFound(format!("{:?}", id)))?;
        if node.expanded {
            return Ok(None);
        }
        node.expanded = true;

        if !node.children.is_empty() || node.children.total == 0 {
            log::debug!("Expanded {:?} without fetching", id);
            return Ok(None);
        }
        if !start_loading(&mut node.children) {
            return Ok(None);
        }
        log::debug!("Expanding {:?}, fetching first page", id);
        Ok(Some(self.pending(Some(id), 0, self.config.page_size, FetchKind::Expand)))
    }

    /// Fetch the next page of a node's children
    pub fn begin_load_more(&mut self, id: T::Id) -> TreeResult<Option<PendingFetch<T>>> {
        let list = self
            .forest
            .child_list_mut(Some(id))
            .ok_or_else(|| TreeError::NodeNotFound(format!("{:?}", id)))?;
        let offset = list_offset_if_startable(list);
        Ok(self.begin_page(Some(id), offset))
    }

    /// Fetch the next page of root-level items
    pub fn begin_load_more_roots(&mut self) -> Option<PendingFetch<T>> {
        let offset = list_offset_if_startable(&mut self.forest.roots);
        self.begin_page(None, offset)
    }

    fn begin_page(&self, parent: Option<T::Id>, offset: Option<usize>) -> Option<PendingFetch<T>> {
        let Some(offset) = offset else {
            log::debug!("Load more under {} ignored", label::<T>(parent));
            return None;
        };
        let page_size = match parent {
            Some(_) => self.config.page_size,
            None => self.config.root_page_size,
        };
        log::debug!("Loading more under {} from offset {}", label::<T>(parent), offset);
        Some(self.pending(parent, offset, page_size, FetchKind::LoadMore))
    }

    // Applying results

    /// Merge a finished fetch into the forest
    ///
    /// Stale outcomes are dropped. A failed fetch resets the loading flag,
    /// records the error on the node and is returned as `TreeError::Fetch`;
    /// nothing else in the forest changes.
    pub fn apply(&mut self, outcome: FetchOutcome<T>) -> TreeResult<Applied> {
        if outcome.generation != self.generation {
            log::warn!(
                "Discarding result for {} from generation {} (now {})",
                label::<T>(outcome.parent_id),
                outcome.generation,
                self.generation
            );
            return Ok(Applied::Discarded);
        }
        match outcome.kind {
            FetchKind::Load => self.apply_load(outcome),
            FetchKind::Expand | FetchKind::LoadMore => self.apply_page(outcome),
        }
    }

    fn apply_load(&mut self, outcome: FetchOutcome<T>) -> TreeResult<Applied> {
        self.forest.roots.loading = false;
        let page = match outcome.result {
            Ok(page) => page,
            Err(error) => return Err(self.record_failure(None, error)),
        };

        let reported = page.total_count;
        let mut forest = match build_forest(page.items) {
            Ok(forest) => forest,
            Err(e) => {
                self.forest.roots.error = Some(FetchError::Invalid(e.to_string()));
                return Err(e);
            }
        };
        // Flat descendants in the batch are not root-level items
        forest.roots.total = reported.unwrap_or(0).max(forest.roots.len());
        let added = forest.roots.len();
        self.replace_forest(forest);
        Ok(Applied::Merged { added })
    }

    fn apply_page(&mut self, outcome: FetchOutcome<T>) -> TreeResult<Applied> {
        let parent = outcome.parent_id;
        let Some(level) = self.forest.child_level(parent) else {
            log::warn!("Discarding page for {}: node no longer exists", label::<T>(parent));
            return Ok(Applied::Discarded);
        };
        if let Some(list) = self.forest.child_list_mut(parent) {
            list.loading = false;
        }

        let page = match outcome.result {
            Ok(page) => page,
            Err(error) => return Err(self.record_failure(parent, error)),
        };

        let existing = self.forest.ids();
        let ChildPage { items, total_count } = page;
        let fetched = items.len();
        let items = sanitize_page(items, parent, outcome.page_size, &existing);
        let mut nodes = match build_subtree(items, level) {
            Ok(nodes) => nodes,
            Err(e) => {
                if let Some(list) = self.forest.child_list_mut(parent) {
                    list.error = Some(FetchError::Invalid(e.to_string()));
                }
                return Err(e);
            }
        };
        // Descendants whose direct parent was dropped surface as extra roots
        nodes.retain(|n| n.parent_id() == parent && !overlaps(n, &existing));

        let Some(list) = self.forest.child_list_mut(parent) else {
            return Ok(Applied::Discarded);
        };
        if let Some(total) = total_count {
            list.total = total;
        }
        let added = nodes.len();
        list.nodes.extend(nodes);
        // The next offset is children.len(), which an unproductive page leaves unchanged
        if added == 0 && list.has_more() {
            log::warn!(
                "Page under {} added nothing while {} more were expected, trimming total",
                label::<T>(parent),
                list.remaining()
            );
            list.total = list.len();
        }
        if list.clamp_total() {
            log::warn!("More children than reported under {}, raising total", label::<T>(parent));
        }

        log::debug!(
            "Merged {} of {} fetched item(s) under {} ({}/{})",
            added,
            fetched,
            label::<T>(parent),
            list.len(),
            list.total
        );
        Ok(Applied::Merged { added })
    }

    fn record_failure(&mut self, parent: Option<T::Id>, error: FetchError) -> TreeError {
        log::warn!("Fetch under {} failed: {}", label::<T>(parent), error);
        if let Some(list) = self.forest.child_list_mut(parent) {
            list.error = Some(error.clone());
        }
        TreeError::Fetch {
            node: label::<T>(parent),
            source: error,
        }
    }

    // One-shot operations

    async fn drive(&mut self, pending: Option<PendingFetch<T>>) -> TreeResult<Applied> {
        match pending {
            Some(pending) => {
                let outcome = pending.run().await;
                self.apply(outcome)
            }
            None => Ok(Applied::Unchanged),
        }
    }

    /// Initial load, or a full refresh discarding the current forest
    pub async fn load(&mut self) -> TreeResult<Applied> {
        let pending = self.begin_load();
        self.drive(pending).await
    }

    pub async fn expand(&mut self, id: T::Id) -> TreeResult<Applied> {
        let pending = self.begin_expand(id)?;
        self.drive(pending).await
    }

    pub async fn load_more(&mut self, id: T::Id) -> TreeResult<Applied> {
        let pending = self.begin_load_more(id)?;
        self.drive(pending).await
    }

    pub async fn load_more_roots(&mut self) -> TreeResult<Applied> {
        let pending = self.begin_load_more_roots();
        self.drive(pending).await
    }

    /// Retry after a failed fetch under `parent` (None = root level)
    ///
    /// A failed expand leaves the node expanded, so retrying is a load-more.
    /// An empty forest whose initial load failed is loaded again.
    pub async fn retry(&mut self, parent: Option<T::Id>) -> TreeResult<Applied> {
        match parent {
            Some(id) => self.load_more(id).await,
            None if self.forest.is_empty() => self.load().await,
            None => self.load_more_roots().await,
        }
    }

    /// Expand if collapsed, collapse if expanded
    pub async fn toggle(&mut self, id: T::Id) -> TreeResult<Applied> {
        let expanded = self
            .forest
            .get(id)
            .map(|n| n.expanded)
            .ok_or_else(|| TreeError::NodeNotFound(format!("{:?}", id)))?;
        if expanded {
            self.collapse(id)?;
            Ok(Applied::Unchanged)
        } else {
            self.expand(id).await
        }
    }

    // Synchronous state changes

    /// Hide a node's children; they stay materialized for the next expand
    pub fn collapse(&mut self, id: T::Id) -> TreeResult<()> {
        let node = self
            .forest
            .get_mut(id)
            .ok_or_else(|| TreeError::NodeNotFound(format!("{:?}", id)))?;
        node.expanded = false;
        log::debug!("Collapsed {:?}", id);
        Ok(())
    }

    pub fn collapse_all(&mut self) {
        tree::collapse_all(&mut self.forest.roots.nodes);
    }

    /// Expand every ancestor of `id` so the node becomes visible
    pub fn reveal(&mut self, id: T::Id) -> TreeResult<()> {
        let path = self
            .forest
            .path_to(id)
            .ok_or_else(|| TreeError::NodeNotFound(format!("{:?}", id)))?;
        for ancestor in &path[..path.len() - 1] {
            if let Some(node) = self.forest.get_mut(*ancestor) {
                node.expanded = true;
            }
        }
        Ok(())
    }

    // Structural edits

    pub fn can_reparent(&self, id: T::Id, target: Option<T::Id>) -> bool {
        mutation::can_reparent(&self.forest, id, target)
    }

    pub fn reparent(&mut self, id: T::Id, target: Option<T::Id>) -> TreeResult<()> {
        mutation::reparent(&mut self.forest, id, target)
    }

    pub fn delete(&mut self, id: T::Id) -> TreeResult<Node<T>> {
        mutation::delete(&mut self.forest, id)
    }
}

/// Flip a child list into loading state; false if a fetch is already out
fn start_loading<T>(list: &mut ChildList<T>) -> bool {
    if list.loading {
        return false;
    }
    list.loading = true;
    list.error = None;
    true
}

/// Next offset for a load-more on `list`, or None if it must not start
fn list_offset_if_startable<T>(list: &mut ChildList<T>) -> Option<usize> {
    if list.loading || !list.has_more() {
        return None;
    }
    start_loading(list);
    Some(list.len())
}

/// Keep items that belong under `parent`, within the page bound, and new
fn sanitize_page<T: Entity>(
    items: Vec<SourceItem<T>>,
    parent: Option<T::Id>,
    page_size: usize,
    existing: &HashSet<T::Id>,
) -> Vec<SourceItem<T>> {
    let in_page: HashSet<T::Id> = items.iter().map(|i| i.id()).collect();
    let mut direct = 0;
    items
        .into_iter()
        .filter(|item| {
            let id = item.id();
            if existing.contains(&id) {
                log::debug!("Skipping {:?}: already in the forest", id);
                return false;
            }
            match item.parent_id() {
                p if p == parent => {
                    direct += 1;
                    if direct > page_size {
                        log::warn!(
                            "Page for {} exceeds {} items, truncating",
                            label::<T>(parent),
                            page_size
                        );
                        return false;
                    }
                    true
                }
                Some(p) if in_page.contains(&p) => true,
                other => {
                    log::warn!(
                        "Skipping {:?}: belongs to {:?}, not {}",
                        id,
                        other,
                        label::<T>(parent)
                    );
                    false
                }
            }
        })
        .collect()
}

/// Whether any id in the subtree of `node` is already present
fn overlaps<T: Entity>(node: &Node<T>, existing: &HashSet<T::Id>) -> bool {
    let mut ids = HashSet::new();
    collect_ids(std::slice::from_ref(node), &mut ids);
    !ids.is_disjoint(existing)
}
