//! Tree Utilities
//!
//! Traversals over materialized nodes and the visibility projection that
//! turns a forest into render-ready rows.

use std::collections::HashSet;
use std::ops::ControlFlow;

use crate::domain::{ChildList, Entity, Node, Row};
use crate::forest::Forest;

/// Flatten the forest into visible rows using recursive DFS
///
/// A node is followed by its children only when it is expanded. Collapsed
/// subtrees stay in memory but are skipped. Each child list that is not
/// loading ends with a `LoadMore` placeholder when the source reports more
/// children, or a `Failed` row when its last fetch failed.
pub fn project<T: Entity>(forest: &Forest<T>) -> Vec<Row<'_, T>> {
    let mut rows = Vec::new();
    project_children(forest.root_list(), None, 0, &mut rows);
    rows
}

fn project_children<'a, T: Entity>(
    list: &'a ChildList<T>,
    parent_id: Option<T::Id>,
    level: usize,
    rows: &mut Vec<Row<'a, T>>,
) {
    for node in list.nodes() {
        rows.push(Row::Node(node));
        if node.is_expanded() {
            project_children(node.child_list(), Some(node.id()), node.hierarchy_level() + 1, rows);
        }
    }

    if list.is_loading() {
        return;
    }
    if let Some(error) = list.error() {
        rows.push(Row::Failed {
            parent_id,
            error,
            level,
        });
    } else if list.has_more() {
        rows.push(Row::LoadMore {
            parent_id,
            remaining: list.remaining(),
            level,
        });
    }
}

/// Generic tree fold over a list of sibling subtrees
///
/// Applies `f` to each node after its children have been folded; returns one
/// result per sibling.
pub fn fold_tree<'a, T, B, F>(nodes: &'a [Node<T>], f: &F) -> Vec<B>
where
    T: Entity,
    F: Fn(&'a Node<T>, Vec<B>) -> B,
{
    nodes
        .iter()
        .map(|node| {
            let child_results = fold_tree(node.children(), f);
            f(node, child_results)
        })
        .collect()
}

/// Mutable pre-order walk with early exit via ControlFlow
pub fn fold_tree_mut<T, B, F>(nodes: &mut [Node<T>], f: &mut F) -> ControlFlow<B>
where
    T: Entity,
    F: FnMut(&mut Node<T>) -> ControlFlow<B>,
{
    for node in nodes.iter_mut() {
        f(node)?;
        fold_tree_mut(&mut node.children.nodes, f)?;
    }
    ControlFlow::Continue(())
}

/// Find a node anywhere below `nodes`
pub fn find_node<T: Entity>(nodes: &[Node<T>], id: T::Id) -> Option<&Node<T>> {
    for node in nodes {
        if node.id() == id {
            return Some(node);
        }
        if let Some(found) = find_node(node.children(), id) {
            return Some(found);
        }
    }
    None
}

/// Mutable variant of [`find_node`]
pub fn find_node_mut<T: Entity>(nodes: &mut [Node<T>], id: T::Id) -> Option<&mut Node<T>> {
    for node in nodes.iter_mut() {
        if node.id() == id {
            return Some(node);
        }
        if let Some(found) = find_node_mut(&mut node.children.nodes, id) {
            return Some(found);
        }
    }
    None
}

/// Whether `id` is `root` itself or anywhere in its materialized subtree
pub fn subtree_contains<T: Entity>(root: &Node<T>, id: T::Id) -> bool {
    root.id() == id || find_node(root.children(), id).is_some()
}

/// Collect every materialized id, regardless of expansion state
pub fn collect_ids<T: Entity>(nodes: &[Node<T>], out: &mut HashSet<T::Id>) {
    let sets = fold_tree(nodes, &|n, child_sets: Vec<HashSet<T::Id>>| {
        let mut ids: HashSet<T::Id> = child_sets.into_iter().flatten().collect();
        ids.insert(n.id());
        ids
    });
    out.extend(sets.into_iter().flatten());
}

/// Collapse every node; materialized children are kept
pub fn collapse_all<T: Entity>(nodes: &mut [Node<T>]) {
    let _ = fold_tree_mut(nodes, &mut |n| {
        n.expanded = false;
        ControlFlow::<()>::Continue(())
    });
}
