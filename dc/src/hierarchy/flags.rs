//! Promote/demote eligibility flags
//!
//! Recomputed forest-wide after every structural change.

use tracing::debug;

use super::finder;
use super::forest::Forest;
use super::state::HierarchyState;
use crate::domain::NodeId;
use crate::rules::TypeRules;

/// Recompute `can_promote`/`can_demote` for every node
pub fn recalculate_flags(state: &mut HierarchyState, rules: &TypeRules) {
    let order = finder::walk_depth_first(state.forest());
    let flags: Vec<(NodeId, bool, bool)> = order
        .into_iter()
        .map(|id| {
            let promote = can_promote(state.forest(), &id);
            let demote = can_demote(state.forest(), rules, &id);
            (id, promote, demote)
        })
        .collect();

    let forest = state.forest_mut();
    for (id, promote, demote) in &flags {
        if let Some(slot) = forest.get_mut(id) {
            slot.can_promote = *promote;
            slot.can_demote = *demote;
        }
    }
    debug!(nodes = flags.len(), "recalculate_flags: complete");
}

/// A node can be promoted iff it has a parent
pub fn can_promote(forest: &Forest, id: &NodeId) -> bool {
    forest.get(id).is_some_and(|slot| slot.parent().is_some())
}

/// A node can be demoted iff its preceding sibling can take it as a child
pub fn can_demote(forest: &Forest, rules: &TypeRules, id: &NodeId) -> bool {
    let Some(sibling_id) = forest.preceding_sibling(id) else {
        return false;
    };
    if finder::is_descendant(forest, id, sibling_id) {
        return false;
    }
    forest
        .get(sibling_id)
        .is_some_and(|sibling| !rules.child_types_for(sibling.item_type()).is_empty())
}
