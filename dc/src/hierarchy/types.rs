//! Type rules resolution against the live forest
//!
//! Answers "what may go under this node" and "what may this node become
//! after a promote/demote", and re-validates types after structural moves.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::state::HierarchyState;
use crate::domain::{NodeId, TypeName, default_title, is_default_title};
use crate::rules::TypeRules;

/// Explicit per-node type choices for a promote/demote batch
pub type TypeMap = HashMap<NodeId, TypeName>;

/// Read-only type queries over the current forest
pub struct TypeResolver<'a> {
    state: &'a HierarchyState,
    rules: &'a TypeRules,
}

impl<'a> TypeResolver<'a> {
    pub fn new(state: &'a HierarchyState, rules: &'a TypeRules) -> Self {
        Self { state, rules }
    }

    /// Types that may be added under a node, or at the root when `None`
    pub fn get_possible_child_types(&self, parent_id: Option<&NodeId>) -> Vec<TypeName> {
        match parent_id {
            Some(id) => match self.state.find_node_by_id(id) {
                Some(parent) => self.rules.child_types_for(parent.item_type()),
                None => {
                    self.state
                        .raise_error(&format!("Cannot resolve child types: parent {} not found", id));
                    Vec::new()
                }
            },
            None => match self.state.root_type() {
                Some(root_type) => self.rules.child_types_for(root_type),
                None => vec![self.rules.fallback_type().clone()],
            },
        }
    }

    /// Raw configured child types of a type
    pub fn get_allowed_child_types(&self, parent_type: &TypeName) -> Vec<TypeName> {
        self.rules.allowed_child_types(parent_type)
    }

    pub fn can_type_be_child_of_type(&self, child_type: &TypeName, parent_type: &TypeName) -> bool {
        self.rules.can_be_child_of(child_type, parent_type)
    }

    /// Legal types for a node placed under `parent`
    ///
    /// `None` means placement is unconstrained (root level with no declared
    /// root type, or an unresolvable parent).
    pub fn legal_types_under(&self, parent: Option<&NodeId>) -> Option<Vec<TypeName>> {
        match parent {
            Some(parent_id) => self
                .state
                .find_node_by_id(parent_id)
                .map(|p| self.rules.child_types_for(p.item_type())),
            None => self.state.root_type().map(|root| self.rules.child_types_for(root)),
        }
    }

    /// Types a node may take once promoted next to its parent
    pub fn get_possible_promote_types(&self, id: &NodeId) -> Vec<TypeName> {
        let Some(node) = self.state.find_node_by_id(id) else {
            return Vec::new();
        };
        let current = vec![node.item_type().clone()];
        let Some(parent) = node.parent().and_then(|p| self.state.find_node_by_id(p)) else {
            return current;
        };
        match self.legal_types_under(parent.parent()) {
            Some(types) if !types.is_empty() => types,
            _ => current,
        }
    }

    /// Types a node may take once demoted
    ///
    /// The demoted node itself becomes a child of its preceding sibling.
    /// A cascading node keeps its parent, so it must stay legal there.
    pub fn get_possible_demote_types(&self, id: &NodeId, is_cascading: bool) -> Vec<TypeName> {
        let Some(node) = self.state.find_node_by_id(id) else {
            return Vec::new();
        };
        if is_cascading {
            return self
                .legal_types_under(node.parent())
                .unwrap_or_else(|| vec![node.item_type().clone()]);
        }
        self.state
            .forest()
            .preceding_sibling(id)
            .and_then(|sibling| self.state.find_node_by_id(sibling))
            .map(|sibling| self.rules.child_types_for(sibling.item_type()))
            .unwrap_or_default()
    }
}

/// Apply user-chosen types, following default titles along
///
/// Only entries for ids in `affected` (the nodes a promote/demote moves)
/// are applied; any other entry is skipped with a warning.
pub fn apply_type_map_to_affected_nodes(state: &mut HierarchyState, type_map: &TypeMap, affected: &[NodeId]) {
    debug!(entries = type_map.len(), affected = affected.len(), "apply_type_map_to_affected_nodes: called");
    let affected: HashSet<&NodeId> = affected.iter().collect();
    for (id, new_type) in type_map {
        if !affected.contains(id) {
            warn!(%id, %new_type, "Type map names a node that is not being moved, skipping");
            continue;
        }
        match state.find_node_by_id_mut(id) {
            Some(slot) => set_type_tracking_title(&mut slot.title, &mut slot.item_type, new_type),
            None => warn!(%id, "Type map names a node that is not in the hierarchy"),
        }
    }
}

/// Re-validate a moved node and its subtree against their new parents
///
/// The node must already sit at its new position. Explicit choices in
/// `type_map` win while they stay legal; otherwise the first legal type is
/// used.
pub fn recursively_update_type_and_children(
    state: &mut HierarchyState,
    rules: &TypeRules,
    id: &NodeId,
    type_map: Option<&TypeMap>,
) {
    let Some(slot) = state.find_node_by_id(id) else {
        return;
    };
    let current = slot.item_type().clone();
    let title = slot.title().to_string();
    let children = slot.children().to_vec();
    let legal = TypeResolver::new(state, rules).legal_types_under(slot.parent());
    let chosen = type_map.and_then(|m| m.get(id));

    let new_type = match legal {
        None => chosen.cloned().unwrap_or_else(|| current.clone()),
        Some(legal) => match chosen {
            Some(choice) if legal.contains(choice) => choice.clone(),
            Some(choice) => match legal.first() {
                Some(first) => {
                    warn!(%id, %choice, fallback = %first, "Chosen type is not legal at new position, using first legal type");
                    first.clone()
                }
                None => {
                    state.raise_error(&format!(
                        "No legal type for \"{}\" at its new position; keeping {}",
                        title, current
                    ));
                    current.clone()
                }
            },
            None => match legal.first() {
                Some(first) => first.clone(),
                None => {
                    state.raise_error(&format!(
                        "Type {} of \"{}\" is not allowed at its new position and no alternative exists",
                        current, title
                    ));
                    current.clone()
                }
            },
        },
    };

    if new_type != current {
        debug!(%id, from = %current, to = %new_type, "recursively_update_type_and_children: retyping");
        if let Some(slot) = state.find_node_by_id_mut(id) {
            set_type_tracking_title(&mut slot.title, &mut slot.item_type, &new_type);
        }
    }

    for child in children {
        recursively_update_type_and_children(state, rules, &child, type_map);
    }
}

/// Set a type, rewriting the title only if it was the old default
pub(crate) fn set_type_tracking_title(title: &mut String, item_type: &mut TypeName, new_type: &TypeName) {
    if is_default_title(title, item_type) {
        *title = default_title(new_type);
    }
    *item_type = new_type.clone();
}
