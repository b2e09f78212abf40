//! Source Items
//!
//! The flat (optionally nested) shape in which entities arrive from the
//! external data source, before they are promoted to tree nodes.

use serde::{Deserialize, Serialize};

use super::entity::Entity;

/// One entity as delivered by the data source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceItem<T> {
    #[serde(flatten)]
    pub entity: T,
    /// Direct-child count reported by the server, if it sent one
    #[serde(default)]
    pub total_child_count: Option<usize>,
    /// Pre-expanded subtrees are materialized by the builder
    #[serde(default)]
    pub expanded: bool,
    /// Children embedded directly in this item
    #[serde(default = "Vec::new")]
    pub children: Vec<SourceItem<T>>,
}

impl<T: Entity> SourceItem<T> {
    pub fn new(entity: T) -> Self {
        Self {
            entity,
            total_child_count: None,
            expanded: false,
            children: Vec::new(),
        }
    }

    pub fn with_total(mut self, total: usize) -> Self {
        self.total_child_count = Some(total);
        self
    }

    pub fn expanded(mut self) -> Self {
        self.expanded = true;
        self
    }

    pub fn with_children(mut self, children: Vec<SourceItem<T>>) -> Self {
        self.children = children;
        self
    }

    pub fn id(&self) -> T::Id {
        self.entity.id()
    }

    pub fn parent_id(&self) -> Option<T::Id> {
        self.entity.parent_id()
    }
}

impl<T: Entity> From<T> for SourceItem<T> {
    fn from(entity: T) -> Self {
        Self::new(entity)
    }
}
