//! Hierarchy Builder
//!
//! Turns a flat (optionally nested) batch of source items into rooted trees
//! and assigns every materialized node its hierarchy level.
//!
//! Only branches whose item arrives marked `expanded` are materialized;
//! children of collapsed items are left for the lazy loader even when the
//! batch contains them. Malformed batches fail as a whole: nothing is built.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::domain::{ChildList, Entity, Node, SourceItem, TreeError, TreeResult};
use crate::forest::Forest;

/// One indexed batch item
struct Entry<T> {
    entity: T,
    total: Option<usize>,
    expanded: bool,
    /// Arrival order, breaks ties between equal creation times
    seq: usize,
}

impl<T: Entity> Entry<T> {
    fn sort_key(&self) -> (DateTime<Utc>, usize) {
        (self.entity.created_at(), self.seq)
    }
}

/// Batch indexed by id, with parent links resolved
struct Index<T: Entity> {
    entries: HashMap<T::Id, Entry<T>>,
    /// Ids in arrival order
    order: Vec<T::Id>,
}

impl<T: Entity> Index<T> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Index `item` and, recursively, its embedded children
    fn insert(&mut self, item: SourceItem<T>) -> TreeResult<()> {
        let SourceItem {
            entity,
            total_child_count,
            expanded,
            children,
        } = item;
        let id = entity.id();

        if entity.parent_id() == Some(id) {
            return Err(TreeError::MalformedInput(format!(
                "item {:?} is its own parent",
                id
            )));
        }

        let existing_parent = self.entries.get(&id).map(|e| e.entity.parent_id());
        match existing_parent {
            Some(parent) if parent != entity.parent_id() => {
                return Err(TreeError::MalformedInput(format!(
                    "item {:?} appears under both {:?} and {:?}",
                    id,
                    parent,
                    entity.parent_id()
                )));
            }
            Some(_) => {
                log::warn!("Duplicate item {:?} in batch, keeping the first", id);
            }
            None => {
                self.order.push(id);
                self.entries.insert(
                    id,
                    Entry {
                        entity,
                        total: total_child_count,
                        expanded,
                        seq: self.order.len(),
                    },
                );
            }
        }

        for mut child in children {
            match child.parent_id() {
                None => child.entity.set_parent_id(Some(id)),
                Some(parent) if parent == id => {}
                Some(parent) => {
                    return Err(TreeError::MalformedInput(format!(
                        "item {:?} is embedded in {:?} but names {:?} as parent",
                        child.id(),
                        id,
                        parent
                    )));
                }
            }
            self.insert(child)?;
        }
        Ok(())
    }

    /// Parent of `id` if that parent is part of this batch
    fn batch_parent(&self, id: T::Id) -> Option<T::Id> {
        self.entries
            .get(&id)
            .and_then(|e| e.entity.parent_id())
            .filter(|p| self.entries.contains_key(p))
    }

    /// Reject parent chains that loop back on themselves
    fn check_acyclic(&self) -> TreeResult<()> {
        let mut settled: HashSet<T::Id> = HashSet::new();
        for &start in &self.order {
            let mut on_path: HashSet<T::Id> = HashSet::new();
            let mut current = Some(start);
            while let Some(id) = current {
                if settled.contains(&id) {
                    break;
                }
                if !on_path.insert(id) {
                    return Err(TreeError::MalformedInput(format!(
                        "parent cycle through item {:?}",
                        id
                    )));
                }
                current = self.batch_parent(id);
            }
            settled.extend(on_path);
        }
        Ok(())
    }
}

/// Build a root-level forest from a flat batch
pub fn build_forest<T: Entity>(items: Vec<SourceItem<T>>) -> TreeResult<Forest<T>> {
    let roots = build_subtree(items, 0)?;
    let mut list = ChildList::with_total(roots.len());
    list.nodes = roots;
    Ok(Forest::from_root_list(list))
}

/// Build the trees contained in `items`, placing their roots at `level`
///
/// Items whose parent is absent from the batch become roots of the result,
/// sorted by creation time. Used both for full loads (level 0) and for pages
/// fetched under an existing node.
pub fn build_subtree<T: Entity>(
    items: Vec<SourceItem<T>>,
    level: usize,
) -> TreeResult<Vec<Node<T>>> {
    let batch_len = items.len();
    let mut index = Index::new();
    for item in items {
        index.insert(item)?;
    }
    index.check_acyclic()?;

    let mut roots: Vec<T::Id> = Vec::new();
    let mut children_of: HashMap<T::Id, Vec<T::Id>> = HashMap::new();
    for &id in &index.order {
        match index.batch_parent(id) {
            Some(parent) => children_of.entry(parent).or_default().push(id),
            None => roots.push(id),
        }
    }

    let entries = &index.entries;
    roots.sort_by_key(|id| entries[id].sort_key());
    for siblings in children_of.values_mut() {
        siblings.sort_by_key(|id| entries[id].sort_key());
    }

    let mut entries = index.entries;
    let nodes: Vec<Node<T>> = roots
        .iter()
        .filter_map(|&id| materialize(id, level, &mut entries, &children_of))
        .collect();

    log::debug!(
        "Built {} root(s) at level {} from {} batch item(s), {} left unmaterialized",
        nodes.len(),
        level,
        batch_len,
        entries.len()
    );
    Ok(nodes)
}

/// Promote one entry to a node, recursing only into expanded entries
fn materialize<T: Entity>(
    id: T::Id,
    level: usize,
    entries: &mut HashMap<T::Id, Entry<T>>,
    children_of: &HashMap<T::Id, Vec<T::Id>>,
) -> Option<Node<T>> {
    let entry = entries.remove(&id)?;
    let child_ids = children_of.get(&id).map(Vec::as_slice).unwrap_or(&[]);
    let total = entry.total.unwrap_or(child_ids.len());

    let mut node = Node::new(entry.entity, total);
    node.level = level;
    node.expanded = entry.expanded;

    if entry.expanded {
        node.children.nodes = child_ids
            .iter()
            .filter_map(|&child| materialize(child, level + 1, entries, children_of))
            .collect();
        if node.children.clamp_total() {
            log::warn!(
                "Item {:?} reported {:?} children but {} arrived, raising total",
                id,
                entry.total,
                node.children.len()
            );
        }
    }
    Some(node)
}
