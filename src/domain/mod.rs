//! Domain Layer
//!
//! Contains the entity seam, node records and error types.
//! This layer has no async or I/O dependencies.

mod entity;
mod error;
mod node;
mod records;
mod row;
mod source;

pub use entity::Entity;
pub use error::{FetchError, FetchResult, TreeError, TreeResult};
pub use node::{ChildList, ExpansionState, Node};
pub use records::{Project, ProjectTask, TaskComment};
pub use row::Row;
pub use source::SourceItem;
