//! Hierarchy state store
//!
//! Single owner of the live forest, the declared root type, the inherited
//! path context and the running node count. Callers outside the engine
//! only ever see nested copies.

use tracing::{debug, error};

use super::forest::{Forest, Slot};
use crate::domain::{NodeId, PathContext, TypeName, WorkItemNode};

/// Callback receiving recoverable, user-relevant problems
pub type ErrorSink = Box<dyn Fn(&str)>;

/// Owner of the canonical draft forest
pub struct HierarchyState {
    forest: Forest,
    root_type: Option<TypeName>,
    path_context: PathContext,
    count: usize,
    error_sink: Option<ErrorSink>,
}

impl std::fmt::Debug for HierarchyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchyState")
            .field("forest", &self.forest)
            .field("root_type", &self.root_type)
            .field("path_context", &self.path_context)
            .field("count", &self.count)
            .field("error_sink", &self.error_sink.is_some())
            .finish()
    }
}

impl Default for HierarchyState {
    fn default() -> Self {
        Self::new(None, PathContext::default())
    }
}

impl HierarchyState {
    pub fn new(root_type: Option<TypeName>, path_context: PathContext) -> Self {
        Self {
            forest: Forest::new(),
            root_type,
            path_context,
            count: 0,
            error_sink: None,
        }
    }

    /// Route reported errors to a callback instead of the log
    pub fn set_error_sink(&mut self, sink: ErrorSink) {
        self.error_sink = Some(sink);
    }

    /// Nested copy of the forest
    pub fn get_hierarchy(&self) -> Vec<WorkItemNode> {
        self.forest.snapshot()
    }

    /// The live forest
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// The live forest, for the operations engine and flag recalculation
    pub(crate) fn forest_mut(&mut self) -> &mut Forest {
        &mut self.forest
    }

    /// Replace the forest wholesale
    ///
    /// Subtrees whose IDs collide with nodes already loaded are skipped and
    /// reported. The root type is only replaced when one is given.
    pub fn set_initial_hierarchy(&mut self, nodes: Vec<WorkItemNode>, root_type: Option<TypeName>) {
        debug!(roots = nodes.len(), ?root_type, "set_initial_hierarchy: called");
        let mut forest = Forest::new();
        for node in nodes {
            let id = node.id.clone();
            if let Err(e) = forest.insert_subtree(node, None, None) {
                self.raise_error(&format!("Skipped subtree {} while loading hierarchy: {}", id, e));
            }
        }
        self.forest = forest;
        self.count = self.forest.len();
        if root_type.is_some() {
            self.root_type = root_type;
        }
        debug!(count = self.count, "set_initial_hierarchy: complete");
    }

    /// Live node lookup
    pub fn find_node_by_id(&self, id: &NodeId) -> Option<&Slot> {
        self.forest.get(id)
    }

    pub(crate) fn find_node_by_id_mut(&mut self, id: &NodeId) -> Option<&mut Slot> {
        self.forest.get_mut(id)
    }

    /// Set one node's title
    pub fn update_item_title(&mut self, id: &NodeId, title: impl Into<String>) -> Vec<WorkItemNode> {
        let title = title.into();
        debug!(%id, %title, "update_item_title: called");
        match self.forest.get_mut(id) {
            Some(slot) => slot.title = title,
            None => self.raise_error(&format!("Cannot update title: node {} not found", id)),
        }
        self.get_hierarchy()
    }

    /// Report a recoverable problem; never fails
    pub fn raise_error(&self, message: &str) {
        match &self.error_sink {
            Some(sink) => sink(message),
            None => error!("{}", message),
        }
    }

    /// Apply an incremental change to the node count
    pub fn update_hierarchy_count(&mut self, delta: isize) {
        self.count = self.count.saturating_add_signed(delta);
        debug_assert_eq!(self.count, self.forest.len(), "node count drifted from forest size");
    }

    pub fn hierarchy_count(&self) -> usize {
        self.count
    }

    pub fn root_type(&self) -> Option<&TypeName> {
        self.root_type.as_ref()
    }

    pub fn set_root_type(&mut self, root_type: Option<TypeName>) {
        self.root_type = root_type;
    }

    pub fn path_context(&self) -> &PathContext {
        &self.path_context
    }

    /// Drop every node; root type and path context are kept
    pub fn clear(&mut self) {
        self.forest.clear();
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ty(s: &str) -> TypeName {
        TypeName::new(s).unwrap()
    }

    fn node(id: &str, children: Vec<WorkItemNode>) -> WorkItemNode {
        let mut n = WorkItemNode::new(ty("Task"), None, PathContext::default());
        n.id = NodeId::from(id);
        n.children = children;
        n
    }

    #[test]
    fn test_set_initial_hierarchy_counts() {
        let mut state = HierarchyState::default();
        state.set_initial_hierarchy(vec![node("a", vec![node("b", vec![])]), node("c", vec![])], Some(ty("Epic")));
        assert_eq!(state.hierarchy_count(), 3);
        assert_eq!(state.root_type(), Some(&ty("Epic")));

        // Root type kept when not given
        state.set_initial_hierarchy(vec![], None);
        assert_eq!(state.hierarchy_count(), 0);
        assert_eq!(state.root_type(), Some(&ty("Epic")));
    }

    #[test]
    fn test_duplicate_subtrees_are_reported() {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink_errors = errors.clone();
        let mut state = HierarchyState::default();
        state.set_error_sink(Box::new(move |msg: &str| sink_errors.borrow_mut().push(msg.to_string())));

        state.set_initial_hierarchy(vec![node("a", vec![]), node("a", vec![])], None);
        assert_eq!(state.hierarchy_count(), 1);
        assert_eq!(errors.borrow().len(), 1);
    }

    #[test]
    fn test_get_hierarchy_returns_copies() {
        let mut state = HierarchyState::default();
        state.set_initial_hierarchy(vec![node("a", vec![])], None);
        let mut copy = state.get_hierarchy();
        copy[0].title = "mutated".into();
        assert_eq!(state.get_hierarchy()[0].title, "New Task");
        assert_eq!(state.get_hierarchy(), state.get_hierarchy());
    }

    #[test]
    fn test_update_item_title() {
        let mut state = HierarchyState::default();
        state.set_initial_hierarchy(vec![node("a", vec![])], None);
        let snapshot = state.update_item_title(&"a".into(), "Write docs");
        assert_eq!(snapshot[0].title, "Write docs");
    }

    #[test]
    fn test_update_missing_title_reports_error() {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink_errors = errors.clone();
        let mut state = HierarchyState::default();
        state.set_error_sink(Box::new(move |msg: &str| sink_errors.borrow_mut().push(msg.to_string())));

        let snapshot = state.update_item_title(&"ghost".into(), "x");
        assert!(snapshot.is_empty());
        assert_eq!(errors.borrow().len(), 1);
        assert!(errors.borrow()[0].contains("ghost"));
    }

    #[test]
    fn test_clear_keeps_context() {
        let mut state = HierarchyState::new(Some(ty("Epic")), PathContext::new(Some("Area".into()), None));
        state.set_initial_hierarchy(vec![node("a", vec![])], None);
        state.clear();
        assert_eq!(state.hierarchy_count(), 0);
        assert!(state.get_hierarchy().is_empty());
        assert_eq!(state.root_type(), Some(&ty("Epic")));
        assert_eq!(state.path_context().area_path.as_deref(), Some("Area"));
    }
}
