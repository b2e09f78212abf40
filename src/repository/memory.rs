//! In-memory Child Fetcher
//!
//! Serves pages out of a `tokio::sync::RwLock<Vec<T>>`. Used by the demo and
//! as the test double for the loader: it counts calls, can fail on demand
//! and can simulate latency.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::RwLock;

use super::traits::{ChildFetcher, ChildPage};
use crate::domain::{Entity, FetchError, FetchResult, SourceItem};

pub struct MemoryFetcher<T> {
    entities: RwLock<Vec<T>>,
    calls: AtomicUsize,
    failures: Mutex<VecDeque<FetchError>>,
    latency: Option<Duration>,
    report_totals: bool,
}

impl<T: Entity> MemoryFetcher<T> {
    pub fn new(entities: Vec<T>) -> Self {
        Self {
            entities: RwLock::new(entities),
            calls: AtomicUsize::new(0),
            failures: Mutex::new(VecDeque::new()),
            latency: None,
            report_totals: true,
        }
    }

    /// Sleep this long before answering each fetch
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Leave `ChildPage::total_count` empty, like sources that only send items
    pub fn without_totals(mut self) -> Self {
        self.report_totals = false;
        self
    }

    /// Number of fetch calls received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make the next fetch fail with `error`; queued failures are used in order
    pub fn fail_next(&self, error: FetchError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(error);
        }
    }

    pub async fn insert(&self, entity: T) {
        self.entities.write().await.push(entity);
    }

    /// Remove an entity and its descendants, as a server-side delete would
    pub async fn remove(&self, id: T::Id) -> usize {
        let mut entities = self.entities.write().await;
        let mut doomed = vec![id];
        let mut i = 0;
        while i < doomed.len() {
            let current = doomed[i];
            doomed.extend(
                entities
                    .iter()
                    .filter(|e| e.parent_id() == Some(current))
                    .map(|e| e.id()),
            );
            i += 1;
        }
        let before = entities.len();
        entities.retain(|e| !doomed.contains(&e.id()));
        before - entities.len()
    }

    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    fn next_failure(&self) -> Option<FetchError> {
        self.failures.lock().ok().and_then(|mut f| f.pop_front())
    }
}

#[async_trait]
impl<T: Entity> ChildFetcher<T> for MemoryFetcher<T> {
    async fn fetch(
        &self,
        parent_id: Option<T::Id>,
        offset: usize,
        page_size: usize,
    ) -> FetchResult<ChildPage<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = self.next_failure() {
            return Err(error);
        }

        let entities = self.entities.read().await;
        let mut siblings: Vec<&T> = entities
            .iter()
            .filter(|e| e.parent_id() == parent_id)
            .collect();
        siblings.sort_by_key(|e| e.created_at());
        let total = siblings.len();

        let items = siblings
            .into_iter()
            .skip(offset)
            .take(page_size)
            .map(|e| {
                let id = e.id();
                let child_count = entities.iter().filter(|c| c.parent_id() == Some(id)).count();
                SourceItem::new(e.clone()).with_total(child_count)
            })
            .collect();

        let page = ChildPage::new(items);
        Ok(if self.report_totals {
            page.with_total(total)
        } else {
            page
        })
    }
}
