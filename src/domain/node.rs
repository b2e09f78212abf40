//! Node Record
//!
//! A materialized tree node: the entity itself, its depth, the prefix of its
//! children loaded so far and the expansion/loading flags.

use serde::Serialize;

use super::entity::Entity;
use super::error::FetchError;

/// Materialized children of one parent (a node, or the forest's root level)
///
/// `nodes.len() <= total` holds after every public operation.
#[derive(Debug, Clone, Serialize)]
pub struct ChildList<T> {
    pub(crate) nodes: Vec<Node<T>>,
    /// Authoritative child count as last reported by the source
    pub(crate) total: usize,
    /// A fetch for these children is outstanding
    pub(crate) loading: bool,
    /// Error from the last fetch, cleared when the next one starts
    pub(crate) error: Option<FetchError>,
}

impl<T> Default for ChildList<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            total: 0,
            loading: false,
            error: None,
        }
    }
}

impl<T> ChildList<T> {
    pub(crate) fn with_total(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn nodes(&self) -> &[Node<T>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    /// Children the source reported but which are not loaded yet
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.nodes.len())
    }

    pub fn has_more(&self) -> bool {
        self.remaining() > 0
    }

    /// Raise the total if more children are materialized than reported
    pub(crate) fn clamp_total(&mut self) -> bool {
        if self.nodes.len() > self.total {
            self.total = self.nodes.len();
            return true;
        }
        false
    }
}

/// Where a node stands in the expand flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionState {
    Collapsed,
    /// Expanded, first page still in flight
    Expanding,
    Expanded,
}

/// One entity in the tree
#[derive(Debug, Clone, Serialize)]
pub struct Node<T> {
    pub(crate) entity: T,
    /// Depth from the root (root = 0)
    pub(crate) level: usize,
    pub(crate) expanded: bool,
    pub(crate) children: ChildList<T>,
}

impl<T: Entity> Node<T> {
    /// Promote an entity to a collapsed root-level node
    pub fn new(entity: T, total_child_count: usize) -> Self {
        Self {
            entity,
            level: 0,
            expanded: false,
            children: ChildList::with_total(total_child_count),
        }
    }

    pub fn id(&self) -> T::Id {
        self.entity.id()
    }

    pub fn parent_id(&self) -> Option<T::Id> {
        self.entity.parent_id()
    }

    pub fn entity(&self) -> &T {
        &self.entity
    }

    /// Mutable access to the payload. Id and parent must not be changed here;
    /// use `reparent` to move a node.
    pub fn entity_mut(&mut self) -> &mut T {
        &mut self.entity
    }

    pub fn hierarchy_level(&self) -> usize {
        self.level
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn expansion_state(&self) -> ExpansionState {
        if !self.expanded {
            ExpansionState::Collapsed
        } else if self.children.loading && self.children.is_empty() {
            ExpansionState::Expanding
        } else {
            ExpansionState::Expanded
        }
    }

    pub fn is_loading_children(&self) -> bool {
        self.children.loading
    }

    pub fn children(&self) -> &[Node<T>] {
        &self.children.nodes
    }

    pub fn child_list(&self) -> &ChildList<T> {
        &self.children
    }

    pub fn total_child_count(&self) -> usize {
        self.children.total
    }

    pub fn load_error(&self) -> Option<&FetchError> {
        self.children.error.as_ref()
    }

    pub fn remaining_children(&self) -> usize {
        self.children.remaining()
    }

    pub fn has_more_children(&self) -> bool {
        self.children.has_more()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.total == 0
    }

    /// Indentation in columns for this node's depth
    pub fn indent(&self, width: usize) -> usize {
        self.level * width
    }

    /// Set this node's level and propagate it to every materialized descendant
    pub(crate) fn set_level(&mut self, level: usize) {
        self.level = level;
        for child in &mut self.children.nodes {
            child.set_level(level + 1);
        }
    }
}
