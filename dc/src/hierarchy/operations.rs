//! Structural edit verbs
//!
//! Every verb leaves the forest in a valid state, recomputes flags as its
//! last step and returns a fresh snapshot. Policy violations degrade to
//! no-ops reported through the error sink or the log; only `add_item_after`
//! fails outright, because there is no sensible place to put the item.

use tracing::{debug, info, warn};

use super::error::{HierarchyError, HierarchyResult};
use super::finder;
use super::flags::recalculate_flags;
use super::state::HierarchyState;
use super::types::{
    TypeMap, TypeResolver, apply_type_map_to_affected_nodes, recursively_update_type_and_children,
    set_type_tracking_title,
};
use crate::domain::{NodeId, TypeName, WorkItemNode};
use crate::rules::TypeRules;

/// Mutating verbs over a hierarchy state
pub struct HierarchyOperations<'a> {
    state: &'a mut HierarchyState,
    rules: &'a TypeRules,
}

impl<'a> HierarchyOperations<'a> {
    pub fn new(state: &'a mut HierarchyState, rules: &'a TypeRules) -> Self {
        Self { state, rules }
    }

    /// Build a node without inserting it
    pub fn create_work_item(&self, item_type: TypeName, parent_id: Option<&NodeId>, title: Option<String>) -> WorkItemNode {
        let mut node = WorkItemNode::new(item_type, title, self.state.path_context().clone());
        node.parent_id = parent_id.cloned();
        debug!(id = %node.id, item_type = %node.item_type, "create_work_item: created");
        node
    }

    /// Create a node and append it under `parent_id`, or at the root
    ///
    /// An unknown parent is reported and the node lands at the root.
    pub fn add_item(&mut self, item_type: TypeName, parent_id: Option<&NodeId>, title: Option<String>) -> Vec<WorkItemNode> {
        debug!(%item_type, ?parent_id, "add_item: called");
        let parent = match parent_id {
            Some(id) if self.state.forest().contains(id) => Some(id.clone()),
            Some(id) => {
                self.state
                    .raise_error(&format!("Parent {} not found; adding {} at the root instead", id, item_type));
                None
            }
            None => None,
        };

        if let Some(legal) = TypeResolver::new(self.state, self.rules).legal_types_under(parent.as_ref())
            && !legal.contains(&item_type)
        {
            warn!(%item_type, ?parent, "Adding a type that is not allowed at this position");
        }

        let node = self.create_work_item(item_type, parent.as_ref(), title);
        match self.state.forest_mut().insert_subtree(node, parent.as_ref(), None) {
            Ok(inserted) => self.state.update_hierarchy_count(inserted as isize),
            Err(e) => self.state.raise_error(&format!("Failed to add item: {}", e)),
        }
        self.finish()
    }

    /// Insert `new_item` (with any subtree) right after `after_id`
    pub fn add_item_after(&mut self, new_item: WorkItemNode, after_id: &NodeId) -> HierarchyResult<Vec<WorkItemNode>> {
        debug!(id = %new_item.id, %after_id, "add_item_after: called");
        let forest = self.state.forest();
        let anchor = forest
            .get(after_id)
            .ok_or_else(|| HierarchyError::NodeNotFound(after_id.clone()))?;
        let parent = anchor.parent().cloned();
        if let Some(parent_id) = &parent
            && !forest.contains(parent_id)
        {
            return Err(HierarchyError::ParentNotFound {
                node: after_id.clone(),
                parent: parent_id.clone(),
            });
        }
        let index = forest
            .index_of(after_id)
            .ok_or_else(|| HierarchyError::NodeNotFound(after_id.clone()))?;

        let inserted = self
            .state
            .forest_mut()
            .insert_subtree(new_item, parent.as_ref(), Some(index + 1))?;
        self.state.update_hierarchy_count(inserted as isize);
        Ok(self.finish())
    }

    /// Delete a node and its whole subtree
    pub fn remove_item(&mut self, id: &NodeId) -> Vec<WorkItemNode> {
        debug!(%id, "remove_item: called");
        match self.state.forest_mut().remove_subtree(id) {
            Ok(removed) => {
                self.state.update_hierarchy_count(-(removed as isize));
                info!(%id, removed, "Removed item and its descendants");
            }
            Err(e) => self.state.raise_error(&format!("Cannot remove item: {}", e)),
        }
        self.finish()
    }

    /// Change a node's type directly
    ///
    /// A type that is not legal under the node's parent is reported and
    /// the node is left untouched. Children that stop being legal under the
    /// new type are repaired.
    pub fn update_item_type(&mut self, id: &NodeId, new_type: TypeName) -> Vec<WorkItemNode> {
        debug!(%id, %new_type, "update_item_type: called");
        let Some(slot) = self.state.find_node_by_id(id) else {
            self.state
                .raise_error(&format!("Cannot change type: node {} not found", id));
            return self.finish();
        };
        let children = slot.children().to_vec();
        if let Some(legal) = TypeResolver::new(self.state, self.rules).legal_types_under(slot.parent())
            && !legal.contains(&new_type)
        {
            let allowed: Vec<&str> = legal.iter().map(TypeName::as_str).collect();
            self.state.raise_error(&format!(
                "{} is not allowed at this position (allowed: {})",
                new_type,
                if allowed.is_empty() { "none".to_string() } else { allowed.join(", ") }
            ));
            return self.finish();
        }

        if let Some(slot) = self.state.find_node_by_id_mut(id) {
            set_type_tracking_title(&mut slot.title, &mut slot.item_type, &new_type);
        }

        for child in &children {
            let still_legal = self
                .state
                .find_node_by_id(child)
                .is_some_and(|c| self.rules.can_be_child_of(c.item_type(), &new_type));
            if !still_legal {
                recursively_update_type_and_children(self.state, self.rules, child, None);
            }
        }
        self.finish()
    }

    /// Move a node up one level
    ///
    /// The node becomes its former parent's next sibling and adopts the
    /// siblings that followed it.
    pub fn promote_item(&mut self, id: &NodeId, type_map: Option<&TypeMap>) -> Vec<WorkItemNode> {
        debug!(%id, "promote_item: called");
        let Some(slot) = self.state.find_node_by_id(id) else {
            self.state
                .raise_error(&format!("Cannot promote: node {} not found", id));
            return self.finish();
        };
        let Some(parent_id) = slot.parent().cloned() else {
            warn!(%id, "Root items cannot be promoted");
            return self.finish();
        };

        let followers = self.state.forest().following_siblings(id);
        if let Some(map) = type_map {
            let forest = self.state.forest();
            let mut affected = finder::subtree_ids(forest, id);
            for follower in &followers {
                affected.extend(finder::subtree_ids(forest, follower));
            }
            apply_type_map_to_affected_nodes(self.state, map, &affected);
        }

        let forest = self.state.forest();
        let parent_index = forest.index_of(&parent_id).map(|i| i + 1);
        let (target, index) = match forest.get(&parent_id).and_then(|p| p.parent().cloned()) {
            Some(grandparent) if forest.contains(&grandparent) => (Some(grandparent), parent_index),
            Some(grandparent) => {
                warn!(%id, %grandparent, "Grandparent not found, promoting to the root");
                (None, None)
            }
            None => (None, parent_index),
        };

        let forest = self.state.forest_mut();
        for follower in &followers {
            if let Err(e) = forest.attach(follower, Some(id), None) {
                self.state
                    .raise_error(&format!("Failed to move {} under promoted item: {}", follower, e));
                return self.finish();
            }
        }
        if let Err(e) = self.state.forest_mut().attach(id, target.as_ref(), index) {
            self.state.raise_error(&format!("Failed to promote {}: {}", id, e));
            return self.finish();
        }

        recursively_update_type_and_children(self.state, self.rules, id, type_map);
        info!(%id, adopted = followers.len(), "Promoted item");
        self.finish()
    }

    /// Move a node down one level, under its preceding sibling
    pub fn demote_item(&mut self, id: &NodeId, type_map: Option<&TypeMap>) -> Vec<WorkItemNode> {
        debug!(%id, "demote_item: called");
        let forest = self.state.forest();
        if !forest.contains(id) {
            self.state
                .raise_error(&format!("Cannot demote: node {} not found", id));
            return self.finish();
        }
        let Some(new_parent) = forest.preceding_sibling(id).cloned() else {
            warn!(%id, "Cannot demote the first item at its level");
            return self.finish();
        };
        if finder::is_descendant(forest, id, &new_parent) {
            warn!(%id, %new_parent, "Demotion would create a cycle");
            return self.finish();
        }
        let allows_children = forest
            .get(&new_parent)
            .is_some_and(|p| !self.rules.child_types_for(p.item_type()).is_empty());
        if !allows_children {
            warn!(%id, %new_parent, "Preceding item does not allow children");
            return self.finish();
        }

        if let Some(map) = type_map {
            let affected = finder::subtree_ids(self.state.forest(), id);
            apply_type_map_to_affected_nodes(self.state, map, &affected);
        }

        if let Err(e) = self.state.forest_mut().attach(id, Some(&new_parent), None) {
            self.state.raise_error(&format!("Failed to demote {}: {}", id, e));
            return self.finish();
        }

        recursively_update_type_and_children(self.state, self.rules, id, type_map);
        info!(%id, %new_parent, "Demoted item");
        self.finish()
    }

    fn finish(&mut self) -> Vec<WorkItemNode> {
        recalculate_flags(self.state, self.rules);
        self.state.get_hierarchy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PathContext;
    use crate::rules::TypeDefinition;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    fn ty(s: &str) -> TypeName {
        TypeName::new(s).unwrap()
    }

    fn node(id: &str, item_type: &str, children: Vec<WorkItemNode>) -> WorkItemNode {
        let mut n = WorkItemNode::new(ty(item_type), None, PathContext::default());
        n.id = NodeId::from(id);
        n.children = children;
        n
    }

    fn rules() -> TypeRules {
        let mut types = BTreeMap::new();
        types.insert(ty("Epic"), TypeDefinition::with_children(vec![ty("Feature")]));
        types.insert(ty("Feature"), TypeDefinition::with_children(vec![ty("Task"), ty("Bug")]));
        types.insert(ty("Task"), TypeDefinition::with_children(vec![ty("Task")]));
        types.insert(ty("Bug"), TypeDefinition::with_children(vec![]));
        TypeRules::new(types)
    }

    fn ids(nodes: &[WorkItemNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    fn state_with(nodes: Vec<WorkItemNode>) -> HierarchyState {
        let mut state = HierarchyState::new(Some(ty("Epic")), PathContext::new(Some("Proj\\Area".into()), None));
        state.set_initial_hierarchy(nodes, None);
        recalculate_flags(&mut state, &rules());
        state
    }

    fn capture_errors(state: &mut HierarchyState) -> Rc<RefCell<Vec<String>>> {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        state.set_error_sink(Box::new(move |m: &str| sink.borrow_mut().push(m.to_string())));
        errors
    }

    #[test]
    fn test_create_work_item_is_not_inserted() {
        let mut state = state_with(vec![]);
        let rules = rules();
        let ops = HierarchyOperations::new(&mut state, &rules);
        let item = ops.create_work_item(ty("Feature"), None, None);
        assert_eq!(item.title, "New Feature");
        assert_eq!(item.path.area_path.as_deref(), Some("Proj\\Area"));
        assert_eq!(state.hierarchy_count(), 0);
    }

    #[test]
    fn test_add_item_at_root() {
        let mut state = state_with(vec![]);
        let rules = rules();
        let forest = HierarchyOperations::new(&mut state, &rules).add_item(ty("Feature"), None, None);

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].item_type, ty("Feature"));
        assert_eq!(forest[0].title, "New Feature");
        assert!(!forest[0].can_promote);
        assert!(!forest[0].can_demote);
        assert_eq!(state.hierarchy_count(), 1);
    }

    #[test]
    fn test_add_item_unknown_parent_falls_back_to_root() {
        let mut state = state_with(vec![node("f1", "Feature", vec![])]);
        let errors = capture_errors(&mut state);
        let rules = rules();
        let forest =
            HierarchyOperations::new(&mut state, &rules).add_item(ty("Task"), Some(&"ghost".into()), Some("Fix".into()));

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[1].title, "Fix");
        assert!(forest[1].parent_id.is_none());
        assert_eq!(errors.borrow().len(), 1);
    }

    #[test]
    fn test_add_item_under_parent_appends() {
        let mut state = state_with(vec![node("f1", "Feature", vec![node("t1", "Task", vec![])])]);
        let rules = rules();
        let forest = HierarchyOperations::new(&mut state, &rules).add_item(ty("Bug"), Some(&"f1".into()), None);
        let children = &forest[0].children;
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].item_type, ty("Bug"));
        assert_eq!(children[1].parent_id, Some(NodeId::from("f1")));
        assert!(children[1].can_promote);
        assert!(children[1].can_demote);
    }

    #[test]
    fn test_add_item_after() {
        let mut state = state_with(vec![node("f1", "Feature", vec![node("t1", "Task", vec![]), node("t2", "Task", vec![])])]);
        let rules = rules();
        let mut ops = HierarchyOperations::new(&mut state, &rules);
        let item = ops.create_work_item(ty("Bug"), None, None);
        let new_id = item.id.clone();
        let forest = ops.add_item_after(item, &"t1".into()).unwrap();

        assert_eq!(ids(&forest[0].children), vec!["t1", new_id.as_str(), "t2"]);
        assert_eq!(forest[0].children[1].parent_id, Some(NodeId::from("f1")));
        assert_eq!(state.hierarchy_count(), 4);
    }

    #[test]
    fn test_add_item_after_missing_anchor_fails() {
        let mut state = state_with(vec![node("f1", "Feature", vec![])]);
        let rules = rules();
        let mut ops = HierarchyOperations::new(&mut state, &rules);
        let item = ops.create_work_item(ty("Feature"), None, None);
        let err = ops.add_item_after(item, &"ghost".into()).unwrap_err();
        assert_eq!(err, HierarchyError::NodeNotFound("ghost".into()));
        assert_eq!(state.hierarchy_count(), 1);
    }

    #[test]
    fn test_remove_item_counts_subtree() {
        let mut state = state_with(vec![
            node("f1", "Feature", vec![node("t1", "Task", vec![node("t1a", "Task", vec![])]), node("t2", "Task", vec![])]),
        ]);
        let rules = rules();
        let forest = HierarchyOperations::new(&mut state, &rules).remove_item(&"t1".into());
        assert_eq!(ids(&forest[0].children), vec!["t2"]);
        assert_eq!(state.hierarchy_count(), 2);
        assert!(!forest[0].children[0].can_demote);
    }

    #[test]
    fn test_remove_missing_item_reports() {
        let mut state = state_with(vec![node("f1", "Feature", vec![])]);
        let errors = capture_errors(&mut state);
        let rules = rules();
        let forest = HierarchyOperations::new(&mut state, &rules).remove_item(&"ghost".into());
        assert_eq!(forest.len(), 1);
        assert_eq!(errors.borrow().len(), 1);
    }

    #[test]
    fn test_promote_adopts_followers() {
        // P has children [A, B, C]; promoting B makes C its child and puts B after P
        let mut state = state_with(vec![node(
            "p",
            "Feature",
            vec![node("a", "Task", vec![]), node("b", "Task", vec![node("b1", "Task", vec![])]), node("c", "Task", vec![])],
        )]);
        let rules = rules();
        let forest = HierarchyOperations::new(&mut state, &rules).promote_item(&"b".into(), None);

        assert_eq!(ids(&forest), vec!["p", "b"]);
        assert_eq!(ids(&forest[0].children), vec!["a"]);
        assert_eq!(ids(&forest[1].children), vec!["b1", "c"]);
        assert!(forest[1].parent_id.is_none());
        assert_eq!(forest[1].children[1].parent_id, Some(NodeId::from("b")));
        assert_eq!(state.hierarchy_count(), 5);
    }

    #[test]
    fn test_promote_retypes_subtree() {
        let mut state = state_with(vec![node(
            "p",
            "Feature",
            vec![node("a", "Task", vec![]), node("b", "Task", vec![])],
        )]);
        state.update_item_title(&"a".into(), "Custom work");
        let rules = rules();
        let forest = HierarchyOperations::new(&mut state, &rules).promote_item(&"b".into(), None);

        // b is now a root; the root context only allows Feature
        assert_eq!(forest[1].item_type, ty("Feature"));
        assert_eq!(forest[1].title, "New Feature");
        assert!(forest[1].can_demote);
    }

    #[test]
    fn test_promote_root_is_noop() {
        let mut state = state_with(vec![node("p", "Feature", vec![])]);
        let rules = rules();
        let before = state.get_hierarchy();
        let forest = HierarchyOperations::new(&mut state, &rules).promote_item(&"p".into(), None);
        assert_eq!(forest, before);
    }

    #[test]
    fn test_promote_nested_inserts_after_parent() {
        let mut state = state_with(vec![node(
            "f",
            "Feature",
            vec![node("t1", "Task", vec![node("t1a", "Task", vec![])]), node("t2", "Task", vec![])],
        )]);
        let rules = rules();
        let forest = HierarchyOperations::new(&mut state, &rules).promote_item(&"t1a".into(), None);
        assert_eq!(ids(&forest[0].children), vec!["t1", "t1a", "t2"]);
        assert_eq!(forest[0].children[1].parent_id, Some(NodeId::from("f")));
    }

    #[test]
    fn test_promote_with_type_map() {
        let mut state = state_with(vec![node(
            "f",
            "Feature",
            vec![node("t1", "Task", vec![node("t1a", "Task", vec![])])],
        )]);
        let rules = rules();
        let mut map = TypeMap::new();
        map.insert("t1a".into(), ty("Bug"));
        let forest = HierarchyOperations::new(&mut state, &rules).promote_item(&"t1a".into(), Some(&map));
        let promoted = &forest[0].children[1];
        assert_eq!(promoted.item_type, ty("Bug"));
        assert_eq!(promoted.title, "New Bug");
    }

    #[test]
    fn test_demote_under_preceding_sibling() {
        let mut state = state_with(vec![node(
            "f",
            "Feature",
            vec![node("t1", "Task", vec![node("t1a", "Task", vec![])]), node("t2", "Task", vec![])],
        )]);
        let rules = rules();
        let forest = HierarchyOperations::new(&mut state, &rules).demote_item(&"t2".into(), None);
        assert_eq!(ids(&forest[0].children), vec!["t1"]);
        assert_eq!(ids(&forest[0].children[0].children), vec!["t1a", "t2"]);
        assert_eq!(forest[0].children[0].children[1].parent_id, Some(NodeId::from("t1")));
    }

    #[test]
    fn test_demote_first_child_is_rejected() {
        let mut state = state_with(vec![
            node("f1", "Feature", vec![node("t1", "Task", vec![])]),
            node("f2", "Feature", vec![]),
        ]);
        let rules = rules();
        let before = state.get_hierarchy();
        let mut ops = HierarchyOperations::new(&mut state, &rules);
        assert_eq!(ops.demote_item(&"t1".into(), None), before);
        assert_eq!(ops.demote_item(&"f1".into(), None), before);
    }

    #[test]
    fn test_demote_under_childless_type_is_rejected() {
        let mut state = state_with(vec![node("f", "Feature", vec![node("b", "Bug", vec![]), node("t", "Task", vec![])])]);
        let rules = rules();
        let before = state.get_hierarchy();
        let forest = HierarchyOperations::new(&mut state, &rules).demote_item(&"t".into(), None);
        assert_eq!(forest, before);
    }

    #[test]
    fn test_demote_root_retypes() {
        let mut state = state_with(vec![node("f1", "Feature", vec![]), node("f2", "Feature", vec![])]);
        state.update_item_title(&"f2".into(), "Payments");
        let rules = rules();
        let forest = HierarchyOperations::new(&mut state, &rules).demote_item(&"f2".into(), None);
        assert_eq!(forest.len(), 1);
        let moved = &forest[0].children[0];
        assert_eq!(moved.item_type, ty("Task"));
        assert_eq!(moved.title, "Payments");
        assert!(moved.can_promote);
    }

    #[test]
    fn test_promote_then_demote_restores_parent() {
        let mut state = state_with(vec![node(
            "f",
            "Feature",
            vec![node("t1", "Task", vec![node("t1a", "Task", vec![]), node("t1b", "Task", vec![])])],
        )]);
        let rules = rules();
        let mut ops = HierarchyOperations::new(&mut state, &rules);
        ops.promote_item(&"t1a".into(), None);
        let forest = ops.demote_item(&"t1a".into(), None);
        let t1 = &forest[0].children[0];
        assert_eq!(t1.id.as_str(), "t1");
        assert!(t1.children.iter().any(|c| c.id.as_str() == "t1a"));
    }

    #[test]
    fn test_update_item_type_tracks_title_and_repairs_children() {
        let mut state = state_with(vec![node("f", "Feature", vec![node("t", "Task", vec![node("t2", "Task", vec![])])])]);
        let rules = rules();
        let forest = HierarchyOperations::new(&mut state, &rules).update_item_type(&"t".into(), ty("Bug"));
        let t = &forest[0].children[0];
        assert_eq!(t.item_type, ty("Bug"));
        assert_eq!(t.title, "New Bug");
        // Bug allows no children, so t2 cannot be repaired
        assert_eq!(t.children[0].item_type, ty("Task"));
    }

    #[test]
    fn test_update_item_type_rejects_illegal_type() {
        let mut state = state_with(vec![node("f", "Feature", vec![node("t", "Task", vec![])])]);
        let errors = capture_errors(&mut state);
        let rules = rules();
        let before = state.get_hierarchy();
        let forest = HierarchyOperations::new(&mut state, &rules).update_item_type(&"f".into(), ty("Bug"));

        assert_eq!(forest, before);
        assert_eq!(forest[0].item_type, ty("Feature"));
        assert_eq!(forest[0].title, "New Feature");
        assert_eq!(forest[0].children[0].item_type, ty("Task"));
        assert_eq!(errors.borrow().len(), 1);
        assert!(errors.borrow()[0].contains("allowed: Feature"));
    }

    #[test]
    fn test_update_item_type_rejects_under_childless_parent() {
        let mut state = state_with(vec![node("f", "Feature", vec![node("b", "Bug", vec![node("t", "Task", vec![])])])]);
        let errors = capture_errors(&mut state);
        let rules = rules();
        let forest = HierarchyOperations::new(&mut state, &rules).update_item_type(&"t".into(), ty("Bug"));

        assert_eq!(forest[0].children[0].children[0].item_type, ty("Task"));
        assert!(errors.borrow()[0].contains("allowed: none"));
    }

    #[test]
    fn test_demote_type_map_ignores_unmoved_nodes() {
        let mut state = state_with(vec![
            node("a", "Feature", vec![node("s", "Task", vec![])]),
            node("b", "Feature", vec![]),
            node("other", "Feature", vec![]),
        ]);
        let rules = rules();
        let mut map = TypeMap::new();
        map.insert("b".into(), ty("Bug"));
        map.insert("other".into(), ty("Task"));
        let forest = HierarchyOperations::new(&mut state, &rules).demote_item(&"b".into(), Some(&map));

        assert_eq!(ids(&forest), vec!["a", "other"]);
        assert_eq!(ids(&forest[0].children), vec!["s", "b"]);
        assert_eq!(forest[0].children[1].item_type, ty("Bug"));
        assert_eq!(forest[1].item_type, ty("Feature"));
        assert_eq!(forest[1].title, "New Feature");
    }

    #[test]
    fn test_promote_type_map_covers_adopted_followers_only() {
        let mut state = state_with(vec![
            node("f", "Feature", vec![node("t1", "Task", vec![]), node("t2", "Task", vec![])]),
            node("f2", "Feature", vec![]),
        ]);
        let rules = rules();
        let mut map = TypeMap::new();
        map.insert("t2".into(), ty("Bug"));
        map.insert("f2".into(), ty("Task"));
        let forest = HierarchyOperations::new(&mut state, &rules).promote_item(&"t1".into(), Some(&map));

        assert_eq!(ids(&forest), vec!["f", "t1", "f2"]);
        assert_eq!(forest[1].item_type, ty("Feature"));
        assert_eq!(ids(&forest[1].children), vec!["t2"]);
        assert_eq!(forest[1].children[0].item_type, ty("Bug"));
        assert_eq!(forest[2].item_type, ty("Feature"));
    }
}
