//! Record Entities
//!
//! The three hierarchical record kinds: projects, tasks within a project and
//! comment threads on a task. Each has a single parent of its own kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::Entity;

/// A project, optionally nested under a parent project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: u32,
    pub name: String,
    /// Parent project ID (None = root level)
    pub parent_id: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(id: u32, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id: None,
            created_at,
        }
    }

    pub fn new_child(
        id: u32,
        name: impl Into<String>,
        parent_id: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::new(id, name, created_at)
        }
    }
}

/// A task inside a project; subtasks hang off their parent task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectTask {
    pub id: u32,
    pub project_id: u32,
    pub title: String,
    pub completed: bool,
    /// Parent task ID (None = top-level task of the project)
    pub parent_id: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// A comment on a task; replies hang off the comment they answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskComment {
    pub id: u32,
    pub task_id: u32,
    pub author: String,
    pub body: String,
    /// Comment this one replies to (None = top-level comment)
    pub parent_id: Option<u32>,
    pub created_at: DateTime<Utc>,
}

macro_rules! impl_entity {
    ($ty:ty) => {
        impl Entity for $ty {
            type Id = u32;

            fn id(&self) -> Self::Id {
                self.id
            }

            fn parent_id(&self) -> Option<Self::Id> {
                self.parent_id
            }

            fn set_parent_id(&mut self, parent_id: Option<Self::Id>) {
                self.parent_id = parent_id;
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
        }
    };
}

impl_entity!(Project);
impl_entity!(ProjectTask);
impl_entity!(TaskComment);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_project_creation() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let root = Project::new(1, "Apollo", at);
        let child = Project::new_child(2, "Guidance", 1, at);

        assert_eq!(root.id(), 1);
        assert!(root.is_root());
        assert_eq!(child.parent_id(), Some(1));
        assert!(!child.is_root());
    }

    #[test]
    fn test_comment_reparent() {
        let mut reply = TaskComment {
            id: 9,
            task_id: 4,
            author: "mara".to_string(),
            body: "agreed".to_string(),
            parent_id: Some(3),
            created_at: Utc.timestamp_opt(1_700_000_100, 0).unwrap(),
        };
        reply.set_parent_id(None);
        assert!(reply.is_root());
    }
}
