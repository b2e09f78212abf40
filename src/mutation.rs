//! Reparent / Mutation Guard
//!
//! Structural edits on a materialized forest. Moves are validated before
//! anything is touched, so a rejected move leaves the forest unchanged.

use crate::domain::{ChildList, Entity, Node, TreeError, TreeResult};
use crate::forest::Forest;
use crate::tree::subtree_contains;

/// Whether `node_id` may be moved under `target` (None = root level)
///
/// False when the target is the node itself or one of its materialized
/// descendants, or when the node is not in the forest.
pub fn can_reparent<T: Entity>(forest: &Forest<T>, node_id: T::Id, target: Option<T::Id>) -> bool {
    let Some(node) = forest.get(node_id) else {
        return false;
    };
    match target {
        None => true,
        Some(target) => !subtree_contains(node, target),
    }
}

/// Move a node (with its whole subtree) under `target`
///
/// The old parent's total shrinks by one and the new parent's grows by one,
/// so both keep `children.len() <= total`. Levels are recomputed for the
/// moved subtree.
pub fn reparent<T: Entity>(
    forest: &mut Forest<T>,
    node_id: T::Id,
    target: Option<T::Id>,
) -> TreeResult<()> {
    let current_parent = forest
        .get(node_id)
        .map(|n| n.parent_id())
        .ok_or_else(|| TreeError::NodeNotFound(format!("{:?}", node_id)))?;
    if let Some(target) = target {
        if !forest.contains(target) {
            return Err(TreeError::NodeNotFound(format!("{:?}", target)));
        }
    }
    if !can_reparent(forest, node_id, target) {
        return Err(TreeError::CycleRejected {
            node: format!("{:?}", node_id),
            target: format!("{:?}", target),
        });
    }
    if current_parent == target {
        return Ok(());
    }

    let mut node = take_node(&mut forest.roots, node_id, true)
        .ok_or_else(|| TreeError::NodeNotFound(format!("{:?}", node_id)))?;
    let level = forest
        .child_level(target)
        .ok_or_else(|| TreeError::NodeNotFound(format!("{:?}", target)))?;

    node.entity.set_parent_id(target);
    node.set_level(level);
    let list = forest
        .child_list_mut(target)
        .ok_or_else(|| TreeError::NodeNotFound(format!("{:?}", target)))?;
    list.nodes.push(node);
    list.total += 1;

    log::debug!("Moved {:?} from {:?} to {:?} at level {}", node_id, current_parent, target, level);
    Ok(())
}

/// Remove a node and its materialized subtree
///
/// The parent's total is left alone; the source refreshes it on the next
/// fetch.
pub fn delete<T: Entity>(forest: &mut Forest<T>, node_id: T::Id) -> TreeResult<Node<T>> {
    let node = take_node(&mut forest.roots, node_id, false)
        .ok_or_else(|| TreeError::NodeNotFound(format!("{:?}", node_id)))?;
    log::debug!("Deleted {:?} with {} materialized descendant(s)", node_id, count(&node) - 1);
    Ok(node)
}

/// Detach `id` from whichever child list holds it
fn take_node<T: Entity>(list: &mut ChildList<T>, id: T::Id, shrink_total: bool) -> Option<Node<T>> {
    if let Some(pos) = list.nodes.iter().position(|n| n.id() == id) {
        if shrink_total {
            list.total = list.total.saturating_sub(1);
        }
        return Some(list.nodes.remove(pos));
    }
    list.nodes
        .iter_mut()
        .find_map(|n| take_node(&mut n.children, id, shrink_total))
}

fn count<T: Entity>(node: &Node<T>) -> usize {
    1 + node.children().iter().map(count).sum::<usize>()
}
