//! Lazy Loader Integration Tests
//!
//! Drive LazyTree against MemoryFetcher (and a few hand-rolled fetchers)
//! through expand / load-more / collapse / rebuild sequences.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    use crate::config::TreeConfig;
    use crate::domain::{
        ExpansionState, FetchError, FetchResult, Node, Project, Row, SourceItem, TreeError,
    };
    use crate::loader::{Applied, LazyTree};
    use crate::repository::{ChildFetcher, ChildPage, MemoryFetcher};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn project(id: u32, parent: Option<u32>) -> Project {
        let mut p = Project::new(id, format!("Project {}", id), at(id as i64));
        p.parent_id = parent;
        p
    }

    fn config(page_size: usize) -> TreeConfig {
        TreeConfig {
            page_size,
            root_page_size: page_size,
            ..TreeConfig::default()
        }
    }

    fn setup_tree(
        entities: Vec<Project>,
        page_size: usize,
    ) -> (LazyTree<Project>, Arc<MemoryFetcher<Project>>) {
        let fetcher = Arc::new(MemoryFetcher::new(entities));
        let tree = LazyTree::new(fetcher.clone(), config(page_size));
        (tree, fetcher)
    }

    fn visible(tree: &LazyTree<Project>) -> Vec<u32> {
        tree.rows().iter().filter_map(|r| r.node_id()).collect()
    }

    fn child_ids(tree: &LazyTree<Project>, id: u32) -> Vec<u32> {
        tree.get(id).unwrap().children().iter().map(|n| n.id()).collect()
    }

    fn assert_invariants(nodes: &[Node<Project>], level: usize) {
        let mut seen = HashSet::new();
        for n in nodes {
            assert!(seen.insert(n.id()), "duplicate sibling {}", n.id());
            assert_eq!(n.hierarchy_level(), level, "level of {}", n.id());
            assert!(
                n.children().len() <= n.total_child_count(),
                "node {} has {} children but total {}",
                n.id(),
                n.children().len(),
                n.total_child_count()
            );
            assert_invariants(n.children(), level + 1);
        }
    }

    #[tokio::test]
    async fn test_expand_then_load_more_scenario() {
        let (mut tree, fetcher) = setup_tree(
            vec![project(1, None), project(2, Some(1)), project(3, Some(1))],
            1,
        );
        tree.rebuild(vec![
            SourceItem::new(project(1, None)).with_total(2),
            SourceItem::new(project(2, Some(1))),
            SourceItem::new(project(3, Some(1))),
        ])
        .unwrap();

        let root = tree.get(1).unwrap();
        assert_eq!(root.hierarchy_level(), 0);
        assert_eq!(root.total_child_count(), 2);
        assert!(root.children().is_empty());
        assert!(!root.is_expanded());

        assert_eq!(tree.expand(1).await.unwrap(), Applied::Merged { added: 1 });
        assert_eq!(child_ids(&tree, 1), vec![2]);
        assert_eq!(tree.get(2).unwrap().hierarchy_level(), 1);
        assert!(!tree.get(1).unwrap().is_loading_children());

        let rows = tree.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].node_id(), Some(1));
        assert_eq!(rows[1].node_id(), Some(2));
        assert!(matches!(
            rows[2],
            Row::LoadMore { parent_id: Some(1), remaining: 1, level: 1 }
        ));

        assert_eq!(tree.load_more(1).await.unwrap(), Applied::Merged { added: 1 });
        assert_eq!(child_ids(&tree, 1), vec![2, 3]);
        assert_eq!(visible(&tree), vec![1, 2, 3]);
        assert!(tree.rows().iter().all(|r| !r.is_placeholder()));
        assert_eq!(fetcher.calls(), 2);

        // Fully loaded: nothing more to fetch
        assert_eq!(tree.load_more(1).await.unwrap(), Applied::Unchanged);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_initial_load_and_root_paging() {
        let (mut tree, fetcher) = setup_tree(
            vec![project(1, None), project(2, None), project(3, None), project(4, Some(1))],
            2,
        );

        assert_eq!(tree.load().await.unwrap(), Applied::Merged { added: 2 });
        assert_eq!(visible(&tree), vec![1, 2]);
        assert!(matches!(
            tree.rows().last(),
            Some(Row::LoadMore { parent_id: None, remaining: 1, level: 0 })
        ));
        assert_eq!(tree.get(1).unwrap().total_child_count(), 1);

        tree.load_more_roots().await.unwrap();
        assert_eq!(visible(&tree), vec![1, 2, 3]);
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(tree.generation(), 1);
    }

    #[tokio::test]
    async fn test_load_more_is_single_flight() {
        let mut entities = vec![project(1, None)];
        entities.extend((2..=6).map(|id| project(id, Some(1))));
        let (mut tree, fetcher) = setup_tree(entities, 2);
        tree.load().await.unwrap();
        tree.expand(1).await.unwrap();
        assert_eq!(fetcher.calls(), 2);

        let first = tree.begin_load_more(1).unwrap().expect("first call starts a fetch");
        assert!(tree.get(1).unwrap().is_loading_children());
        assert!(tree.begin_load_more(1).unwrap().is_none());
        assert!(tree.begin_expand(1).unwrap().is_none());

        let outcome = first.run().await;
        assert_eq!(fetcher.calls(), 3);
        assert_eq!(tree.apply(outcome).unwrap(), Applied::Merged { added: 2 });
        assert_eq!(child_ids(&tree, 1), vec![2, 3, 4, 5]);
        assert!(!tree.get(1).unwrap().is_loading_children());
    }

    #[tokio::test]
    async fn test_expand_states() {
        let (mut tree, fetcher) = setup_tree(vec![project(1, None), project(2, Some(1))], 20);
        tree.load().await.unwrap();
        assert_eq!(tree.get(1).unwrap().expansion_state(), ExpansionState::Collapsed);

        let pending = tree.begin_expand(1).unwrap().unwrap();
        assert_eq!(tree.get(1).unwrap().expansion_state(), ExpansionState::Expanding);
        // Loading node shows no placeholder
        assert_eq!(tree.rows().len(), 1);

        tree.apply(pending.run().await).unwrap();
        assert_eq!(tree.get(1).unwrap().expansion_state(), ExpansionState::Expanded);

        // Already expanded: no-op
        assert_eq!(tree.expand(1).await.unwrap(), Applied::Unchanged);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_collapse_keeps_children_and_reexpand_does_not_refetch() {
        let (mut tree, fetcher) = setup_tree(
            vec![project(1, None), project(2, Some(1)), project(3, Some(2))],
            20,
        );
        tree.load().await.unwrap();
        tree.expand(1).await.unwrap();
        tree.expand(2).await.unwrap();
        assert_eq!(visible(&tree), vec![1, 2, 3]);
        let calls = fetcher.calls();

        tree.collapse(1).unwrap();
        assert_eq!(visible(&tree), vec![1]);
        assert_eq!(tree.forest().len(), 3);

        tree.expand(1).await.unwrap();
        assert_eq!(visible(&tree), vec![1, 2, 3]);
        assert!(tree.get(2).unwrap().is_expanded());
        assert_eq!(fetcher.calls(), calls);
    }

    #[tokio::test]
    async fn test_failed_expand_stays_expanded_and_retries() {
        let (mut tree, fetcher) = setup_tree(vec![project(1, None), project(2, Some(1))], 20);
        tree.load().await.unwrap();
        fetcher.fail_next(FetchError::Transport("connection reset".to_string()));

        let err = tree.expand(1).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, TreeError::Fetch { .. }));

        let node = tree.get(1).unwrap();
        assert!(node.is_expanded());
        assert!(!node.is_loading_children());
        assert!(node.load_error().is_some());
        let rows = tree.rows();
        assert!(matches!(rows[1], Row::Failed { parent_id: Some(1), level: 1, .. }));

        assert_eq!(tree.retry(Some(1)).await.unwrap(), Applied::Merged { added: 1 });
        assert_eq!(visible(&tree), vec![1, 2]);
        assert!(tree.get(1).unwrap().load_error().is_none());
    }

    #[tokio::test]
    async fn test_failed_initial_load_retries() {
        let (mut tree, fetcher) = setup_tree(vec![project(1, None)], 20);
        fetcher.fail_next(FetchError::NotFound("workspace".to_string()));

        assert!(tree.load().await.is_err());
        assert!(matches!(
            tree.rows().as_slice(),
            [Row::Failed { parent_id: None, level: 0, .. }]
        ));

        tree.retry(None).await.unwrap();
        assert_eq!(visible(&tree), vec![1]);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_one_node() {
        let (mut tree, fetcher) = setup_tree(
            vec![project(1, None), project(2, None), project(3, Some(1)), project(4, Some(2))],
            20,
        );
        tree.load().await.unwrap();
        tree.expand(2).await.unwrap();

        fetcher.fail_next(FetchError::Timeout(50));
        assert!(tree.expand(1).await.is_err());

        assert_eq!(child_ids(&tree, 2), vec![4]);
        assert!(tree.get(2).unwrap().load_error().is_none());
        assert_eq!(visible(&tree), vec![1, 2, 4]);
    }

    #[tokio::test]
    async fn test_overlapping_pages_do_not_duplicate() {
        let mut entities = vec![project(1, None)];
        entities.extend((2..=6).map(|id| project(id, Some(1))));
        let (mut tree, fetcher) = setup_tree(entities, 2);
        tree.load().await.unwrap();
        tree.expand(1).await.unwrap();
        assert_eq!(child_ids(&tree, 1), vec![2, 3]);

        // A new child sorted first shifts every later page by one
        let mut early = project(10, Some(1));
        early.created_at = at(-100);
        fetcher.insert(early).await;

        tree.load_more(1).await.unwrap();
        tree.load_more(1).await.unwrap();

        let ids = child_ids(&tree, 1);
        let unique: HashSet<u32> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());
        assert_eq!(ids, vec![2, 3, 4, 5]);
        assert_eq!(tree.get(1).unwrap().total_child_count(), 6);
        assert_invariants(tree.forest().roots(), 0);

        // Keep paging: a page of nothing but known ids ends the placeholder
        let mut results = Vec::new();
        for _ in 0..10 {
            let applied = tree.load_more(1).await.unwrap();
            results.push(applied);
            if applied == Applied::Unchanged {
                break;
            }
        }
        assert_eq!(
            results,
            vec![
                Applied::Merged { added: 1 },
                Applied::Merged { added: 0 },
                Applied::Unchanged
            ]
        );
        assert_eq!(child_ids(&tree, 1), vec![2, 3, 4, 5, 6]);
        assert_eq!(tree.get(1).unwrap().total_child_count(), 5);
        assert!(tree.rows().iter().all(|r| !r.is_placeholder()));
        assert_eq!(fetcher.calls(), 6);
    }

    struct FlatBatchFetcher;

    #[async_trait]
    impl ChildFetcher<Project> for FlatBatchFetcher {
        async fn fetch(
            &self,
            parent_id: Option<u32>,
            _offset: usize,
            _page_size: usize,
        ) -> FetchResult<ChildPage<Project>> {
            let items = match parent_id {
                // One pre-expanded root with its children sent flat, no total
                None => vec![
                    SourceItem::new(project(1, None)).expanded(),
                    SourceItem::new(project(2, Some(1))),
                    SourceItem::new(project(3, Some(1))),
                ],
                Some(_) => Vec::new(),
            };
            Ok(ChildPage::new(items))
        }
    }

    #[tokio::test]
    async fn test_flat_preexpanded_load_counts_only_roots() {
        let mut tree = LazyTree::new(Arc::new(FlatBatchFetcher), config(20));
        assert_eq!(tree.load().await.unwrap(), Applied::Merged { added: 1 });

        assert_eq!(tree.forest().root_list().total(), 1);
        assert_eq!(visible(&tree), vec![1, 2, 3]);
        assert!(tree.rows().iter().all(|r| !r.is_placeholder()));
        assert_eq!(tree.load_more_roots().await.unwrap(), Applied::Unchanged);
    }

    struct OverfullFetcher;

    #[async_trait]
    impl ChildFetcher<Project> for OverfullFetcher {
        async fn fetch(
            &self,
            parent_id: Option<u32>,
            _offset: usize,
            _page_size: usize,
        ) -> FetchResult<ChildPage<Project>> {
            let items = match parent_id {
                None => vec![SourceItem::new(project(1, None)).with_total(3)],
                Some(parent) => {
                    // Ignores page_size, and throws in an item for another parent
                    let mut items: Vec<_> = (100..105)
                        .map(|id| SourceItem::new(project(id, Some(parent))))
                        .collect();
                    items.push(SourceItem::new(project(200, Some(99))));
                    items
                }
            };
            Ok(ChildPage::new(items))
        }
    }

    #[tokio::test]
    async fn test_pages_are_bounded_and_attributed() {
        let mut tree = LazyTree::new(Arc::new(OverfullFetcher), config(2));
        tree.load().await.unwrap();

        tree.expand(1).await.unwrap();
        assert_eq!(child_ids(&tree, 1), vec![100, 101]);
        assert!(!tree.forest().contains(200));

        tree.load_more(1).await.unwrap();
        // Reported total was 3; the extra child raises it instead of breaking the bound
        let node = tree.get(1).unwrap();
        assert!(node.children().len() <= node.total_child_count());
        assert_eq!(node.children().len(), 4);
        assert_eq!(node.total_child_count(), 4);
        assert_invariants(tree.forest().roots(), 0);
    }

    #[tokio::test]
    async fn test_stale_generation_is_discarded() {
        let (mut tree, fetcher) = setup_tree(vec![project(1, None), project(2, Some(1))], 20);
        tree.load().await.unwrap();

        let pending = tree.begin_expand(1).unwrap().unwrap();
        let outcome = pending.run().await;

        // Full refresh while the fetch was out
        tree.load().await.unwrap();
        assert_eq!(tree.apply(outcome).unwrap(), Applied::Discarded);

        let node = tree.get(1).unwrap();
        assert!(node.children().is_empty());
        assert!(!node.is_loading_children());
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_result_for_deleted_node_is_discarded() {
        let (mut tree, _fetcher) = setup_tree(vec![project(1, None), project(2, Some(1))], 20);
        tree.load().await.unwrap();

        let pending = tree.begin_expand(1).unwrap().unwrap();
        tree.delete(1).unwrap();
        assert_eq!(tree.apply(pending.run().await).unwrap(), Applied::Discarded);
        assert!(tree.forest().is_empty());
    }

    #[tokio::test]
    async fn test_cleared_tree_discards_results() {
        let (mut tree, _fetcher) = setup_tree(vec![project(1, None), project(2, Some(1))], 20);
        tree.load().await.unwrap();
        let pending = tree.begin_expand(1).unwrap().unwrap();

        tree.clear();
        assert_eq!(tree.apply(pending.run().await).unwrap(), Applied::Discarded);
        assert!(tree.rows().is_empty());
    }

    #[tokio::test]
    async fn test_different_nodes_load_concurrently() {
        let mut entities = vec![project(1, None), project(2, None)];
        entities.extend((10..13).map(|id| project(id, Some(1))));
        entities.extend((20..23).map(|id| project(id, Some(2))));
        let fetcher =
            Arc::new(MemoryFetcher::new(entities).with_latency(Duration::from_millis(20)));
        let mut tree = LazyTree::new(fetcher.clone(), config(20));
        tree.load().await.unwrap();

        let a = tree.begin_expand(1).unwrap().unwrap();
        let b = tree.begin_expand(2).unwrap().unwrap();
        let (a, b) = tokio::join!(a.run(), b.run());
        tree.apply(b).unwrap();
        tree.apply(a).unwrap();

        assert_eq!(visible(&tree), vec![1, 10, 11, 12, 2, 20, 21, 22]);
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_timeout_reports_fetch_error() {
        let fetcher = Arc::new(
            MemoryFetcher::new(vec![project(1, None), project(2, Some(1))])
                .with_latency(Duration::from_millis(200)),
        );
        let mut tree = LazyTree::new(fetcher, config(20));
        tree.rebuild(vec![SourceItem::new(project(1, None)).with_total(1)])
            .unwrap();
        tree.config.fetch_timeout_ms = Some(10);

        let err = tree.expand(1).await.unwrap_err();
        assert_eq!(
            err,
            TreeError::Fetch {
                node: "1".to_string(),
                source: FetchError::Timeout(10),
            }
        );
        assert!(!tree.get(1).unwrap().is_loading_children());
        assert!(tree.get(1).unwrap().is_expanded());
    }

    #[tokio::test]
    async fn test_delete_then_refetch_refreshes_total() {
        let mut entities = vec![project(1, None)];
        entities.extend((2..=5).map(|id| project(id, Some(1))));
        let (mut tree, fetcher) = setup_tree(entities, 2);
        tree.load().await.unwrap();
        tree.expand(1).await.unwrap();

        tree.delete(3).unwrap();
        fetcher.remove(3).await;
        assert_eq!(tree.get(1).unwrap().total_child_count(), 4);

        tree.load_more(1).await.unwrap();
        assert_eq!(child_ids(&tree, 1), vec![2, 4, 5]);
        assert_eq!(tree.get(1).unwrap().total_child_count(), 3);
        assert!(tree.rows().iter().all(|r| !r.is_placeholder()));
    }

    #[tokio::test]
    async fn test_empty_page_trims_stale_total() {
        let fetcher = Arc::new(
            MemoryFetcher::new(vec![project(1, None), project(2, Some(1))]).without_totals(),
        );
        let mut tree = LazyTree::new(fetcher, config(1));
        tree.rebuild(vec![SourceItem::new(project(1, None)).with_total(3)])
            .unwrap();

        tree.expand(1).await.unwrap();
        assert_eq!(tree.get(1).unwrap().remaining_children(), 2);

        tree.load_more(1).await.unwrap();
        let node = tree.get(1).unwrap();
        assert_eq!(node.total_child_count(), 1);
        assert!(!node.has_more_children());
    }

    #[tokio::test]
    async fn test_reparent_and_reveal() {
        let (mut tree, _fetcher) = setup_tree(
            vec![project(1, None), project(2, Some(1)), project(3, Some(2)), project(4, None)],
            20,
        );
        tree.load().await.unwrap();
        tree.expand(1).await.unwrap();
        tree.expand(2).await.unwrap();

        assert!(!tree.can_reparent(1, Some(3)));
        assert!(matches!(
            tree.reparent(1, Some(3)),
            Err(TreeError::CycleRejected { .. })
        ));

        tree.reparent(2, Some(4)).unwrap();
        assert_eq!(tree.get(3).unwrap().hierarchy_level(), 2);
        assert_eq!(visible(&tree), vec![1, 4]);

        tree.collapse_all();
        tree.reveal(3).unwrap();
        assert_eq!(visible(&tree), vec![1, 4, 2, 3]);
        assert_invariants(tree.forest().roots(), 0);
    }

    #[tokio::test]
    async fn test_toggle() {
        let (mut tree, _fetcher) = setup_tree(vec![project(1, None), project(2, Some(1))], 20);
        tree.load().await.unwrap();

        tree.toggle(1).await.unwrap();
        assert_eq!(visible(&tree), vec![1, 2]);
        tree.toggle(1).await.unwrap();
        assert_eq!(visible(&tree), vec![1]);
        assert!(matches!(tree.toggle(9).await, Err(TreeError::NodeNotFound(_))));
    }

    #[tokio::test]
    async fn test_malformed_rebuild_keeps_old_forest() {
        let (mut tree, _fetcher) = setup_tree(vec![project(1, None)], 20);
        tree.load().await.unwrap();
        let generation = tree.generation();

        let err = tree
            .rebuild(vec![SourceItem::new(project(5, Some(5)))])
            .unwrap_err();
        assert!(matches!(err, TreeError::MalformedInput(_)));
        assert_eq!(visible(&tree), vec![1]);
        assert_eq!(tree.generation(), generation);
    }
}
