//! Forest
//!
//! The set of root nodes plus, transitively, their materialized
//! descendants. The root level is a `ChildList` like any node's children,
//! so it can be paged the same way.

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::{ChildList, Entity, Node};
use crate::tree::{collect_ids, find_node, find_node_mut, fold_tree};

#[derive(Debug, Clone, Serialize)]
pub struct Forest<T> {
    pub(crate) roots: ChildList<T>,
}

impl<T> Default for Forest<T> {
    fn default() -> Self {
        Self {
            roots: ChildList::default(),
        }
    }
}

impl<T: Entity> Forest<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_root_list(roots: ChildList<T>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[Node<T>] {
        self.roots.nodes()
    }

    pub fn root_list(&self) -> &ChildList<T> {
        &self.roots
    }

    /// Number of materialized nodes, expanded or not
    pub fn len(&self) -> usize {
        fold_tree(self.roots(), &|_, counts: Vec<usize>| 1 + counts.iter().sum::<usize>())
            .into_iter()
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn get(&self, id: T::Id) -> Option<&Node<T>> {
        find_node(self.roots(), id)
    }

    pub fn get_mut(&mut self, id: T::Id) -> Option<&mut Node<T>> {
        find_node_mut(&mut self.roots.nodes, id)
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> HashSet<T::Id> {
        let mut out = HashSet::new();
        collect_ids(self.roots(), &mut out);
        out
    }

    /// Children of `parent`, or the root level for None
    pub fn child_list(&self, parent: Option<T::Id>) -> Option<&ChildList<T>> {
        match parent {
            None => Some(&self.roots),
            Some(id) => self.get(id).map(|n| &n.children),
        }
    }

    pub(crate) fn child_list_mut(&mut self, parent: Option<T::Id>) -> Option<&mut ChildList<T>> {
        match parent {
            None => Some(&mut self.roots),
            Some(id) => self.get_mut(id).map(|n| &mut n.children),
        }
    }

    /// Level a child of `parent` would have
    pub fn child_level(&self, parent: Option<T::Id>) -> Option<usize> {
        match parent {
            None => Some(0),
            Some(id) => self.get(id).map(|n| n.hierarchy_level() + 1),
        }
    }

    /// Ids from the root down to `id`, inclusive
    pub fn path_to(&self, id: T::Id) -> Option<Vec<T::Id>> {
        fn walk<T: Entity>(nodes: &[Node<T>], id: T::Id, path: &mut Vec<T::Id>) -> bool {
            for node in nodes {
                path.push(node.id());
                if node.id() == id || walk(node.children(), id, path) {
                    return true;
                }
                path.pop();
            }
            false
        }

        let mut path = Vec::new();
        walk(self.roots(), id, &mut path).then_some(path)
    }
}
