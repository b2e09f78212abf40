//! Projection Rows
//!
//! What the visibility projection hands to a renderer: real nodes plus
//! placeholder rows that are never confused with entities.

use super::entity::Entity;
use super::error::FetchError;
use super::node::Node;

/// One render-ready row
#[derive(Debug, Clone)]
pub enum Row<'a, T: Entity> {
    /// A real node
    Node(&'a Node<T>),
    /// More children exist under `parent_id` (None = root level)
    LoadMore {
        parent_id: Option<T::Id>,
        remaining: usize,
        level: usize,
    },
    /// The last fetch under `parent_id` failed; retrying is offered inline
    Failed {
        parent_id: Option<T::Id>,
        error: &'a FetchError,
        level: usize,
    },
}

impl<'a, T: Entity> Row<'a, T> {
    pub fn level(&self) -> usize {
        match self {
            Row::Node(node) => node.hierarchy_level(),
            Row::LoadMore { level, .. } | Row::Failed { level, .. } => *level,
        }
    }

    pub fn as_node(&self) -> Option<&'a Node<T>> {
        match self {
            Row::Node(node) => Some(*node),
            _ => None,
        }
    }

    /// Entity id for node rows
    pub fn node_id(&self) -> Option<T::Id> {
        self.as_node().map(|n| n.id())
    }

    pub fn is_placeholder(&self) -> bool {
        !matches!(self, Row::Node(_))
    }

    pub fn indent(&self, width: usize) -> usize {
        self.level() * width
    }
}
