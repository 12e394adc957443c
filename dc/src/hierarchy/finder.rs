//! Stateless search and traversal helpers
//!
//! Work over both the live arena (`Forest`) and nested snapshots
//! (`WorkItemNode` slices).

use super::forest::Forest;
use crate::domain::{NodeId, WorkItemNode};

/// Check if `candidate` sits anywhere below `ancestor`
///
/// Walks the candidate's parent chain, so cost is bounded by depth.
pub fn is_descendant(forest: &Forest, ancestor: &NodeId, candidate: &NodeId) -> bool {
    let mut current = forest.get(candidate).and_then(|slot| slot.parent());
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        current = forest.get(id).and_then(|slot| slot.parent());
    }
    false
}

/// IDs of a node and all its descendants, depth-first pre-order
pub fn subtree_ids(forest: &Forest, id: &NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect_subtree(forest, id, &mut out);
    out
}

fn collect_subtree(forest: &Forest, id: &NodeId, out: &mut Vec<NodeId>) {
    if let Some(slot) = forest.get(id) {
        out.push(id.clone());
        for child in slot.children() {
            collect_subtree(forest, child, out);
        }
    }
}

/// Number of nodes in a subtree, including its root
pub fn count_subtree(forest: &Forest, id: &NodeId) -> usize {
    subtree_ids(forest, id).len()
}

/// Every node ID reachable from the roots, depth-first pre-order
pub fn walk_depth_first(forest: &Forest) -> Vec<NodeId> {
    let mut out = Vec::with_capacity(forest.len());
    for root in forest.roots() {
        collect_subtree(forest, root, &mut out);
    }
    out
}

/// Recursive search in a nested snapshot
pub fn find_node<'a>(nodes: &'a [WorkItemNode], id: &NodeId) -> Option<&'a WorkItemNode> {
    for node in nodes {
        if &node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node(&node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Total nodes in a nested snapshot
pub fn count_nodes(nodes: &[WorkItemNode]) -> usize {
    nodes.iter().map(WorkItemNode::subtree_size).sum()
}
