//! Repository Layer
//!
//! Child-fetching abstraction and an in-memory implementation.

mod memory;
mod traits;


pub use memory::MemoryFetcher;
pub use traits::{ChildFetcher, ChildPage};
