//! Domain Layer - Core Entity Trait
//!
//! This trait defines the basic contract for every entity that can live in a
//! tree. All entities must have a unique ID, an optional parent reference and
//! a creation time used to order siblings.

use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::hash::Hash;

/// Core trait for all hierarchical entities
pub trait Entity: Sized + Send + Sync + Clone + 'static {
    /// The type of the entity's unique identifier
    type Id: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Returns the entity's unique identifier
    fn id(&self) -> Self::Id;

    /// Returns the parent identifier (None = root)
    fn parent_id(&self) -> Option<Self::Id>;

    /// Points the entity at a new parent
    fn set_parent_id(&mut self, parent_id: Option<Self::Id>);

    /// Stable ordering key among siblings
    fn created_at(&self) -> DateTime<Utc>;

    /// Check if this is a root entity (no parent)
    fn is_root(&self) -> bool {
        self.parent_id().is_none()
    }
}
