//! Lazy Tree
//!
//! Hierarchical records (projects, tasks, comment threads) shown as a tree
//! whose children are fetched page by page on demand.
//!
//! Layered architecture:
//! - domain: Entity seam, node records, rows and errors
//! - hierarchy: Builds a forest out of a flat or nested batch
//! - tree / forest: Visibility projection and lookups over the forest
//! - loader: Expand / load-more coordination against a child fetcher
//! - mutation: Reparent and delete with cycle checks
//! - repository: Child fetcher abstraction and an in-memory implementation

pub mod config;
pub mod domain;
pub mod forest;
pub mod hierarchy;
pub mod loader;
pub mod mutation;
pub mod repository;
pub mod tree;

pub use config::TreeConfig;
pub use domain::{
    ChildList, Entity, ExpansionState, FetchError, Node, Row, SourceItem, TreeError, TreeResult,
};
pub use forest::Forest;
pub use hierarchy::{build_forest, build_subtree};
pub use loader::{Applied, LazyTree, PendingFetch};
pub use repository::{ChildFetcher, ChildPage, MemoryFetcher};
pub use tree::project;
