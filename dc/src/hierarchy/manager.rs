//! HierarchyManager - facade over the hierarchy engine
//!
//! Composes the state store, type resolver, operations engine and flag
//! recalculation into the one API a front end talks to. Every read hands
//! back an owned copy; every write goes through the operations engine.

use tracing::{debug, info};

use super::error::HierarchyResult;
use super::flags::recalculate_flags;
use super::forest::Forest;
use super::operations::HierarchyOperations;
use super::state::{ErrorSink, HierarchyState};
use super::submission::SubmissionPlan;
use super::types::{TypeMap, TypeResolver};
use crate::domain::{NodeId, PathContext, TypeName, WorkItemNode};
use crate::parser::{ParseResult, TextHierarchyParser};
use crate::rules::TypeRules;

/// Draft hierarchy for one item being decomposed
#[derive(Debug)]
pub struct HierarchyManager {
    state: HierarchyState,
    rules: TypeRules,
}

impl HierarchyManager {
    /// Create an empty hierarchy
    ///
    /// `root_type` is the type of the item being decomposed and decides
    /// what may be added at the top level.
    pub fn new(rules: TypeRules, root_type: Option<TypeName>, path_context: PathContext) -> Self {
        debug!(?root_type, "HierarchyManager::new: called");
        Self {
            state: HierarchyState::new(root_type, path_context),
            rules,
        }
    }

    /// Route reported errors to a callback
    pub fn with_error_sink(mut self, sink: ErrorSink) -> Self {
        self.state.set_error_sink(sink);
        self
    }

    pub fn set_error_sink(&mut self, sink: ErrorSink) {
        self.state.set_error_sink(sink);
    }

    pub fn rules(&self) -> &TypeRules {
        &self.rules
    }

    pub fn root_type(&self) -> Option<&TypeName> {
        self.state.root_type()
    }

    pub fn set_root_type(&mut self, root_type: Option<TypeName>) {
        self.state.set_root_type(root_type);
        recalculate_flags(&mut self.state, &self.rules);
    }

    pub fn path_context(&self) -> &PathContext {
        self.state.path_context()
    }

    pub fn get_hierarchy(&self) -> Vec<WorkItemNode> {
        self.state.get_hierarchy()
    }

    /// Read-only view of the live arena
    pub fn forest(&self) -> &Forest {
        self.state.forest()
    }

    pub fn get_hierarchy_count(&self) -> usize {
        self.state.hierarchy_count()
    }

    /// Replace the forest; flags are recomputed
    pub fn set_initial_hierarchy(&mut self, nodes: Vec<WorkItemNode>, root_type: Option<TypeName>) -> Vec<WorkItemNode> {
        self.state.set_initial_hierarchy(nodes, root_type);
        recalculate_flags(&mut self.state, &self.rules);
        self.state.get_hierarchy()
    }

    pub fn clear_hierarchy(&mut self) -> Vec<WorkItemNode> {
        self.state.clear();
        self.state.get_hierarchy()
    }

    /// Copy of a node and its subtree
    pub fn find_node_by_id(&self, id: &NodeId) -> Option<WorkItemNode> {
        self.state.forest().snapshot_node(id)
    }

    pub fn get_possible_child_types(&self, parent_id: Option<&NodeId>) -> Vec<TypeName> {
        self.resolver().get_possible_child_types(parent_id)
    }

    pub fn get_possible_promote_types(&self, id: &NodeId) -> Vec<TypeName> {
        self.resolver().get_possible_promote_types(id)
    }

    pub fn get_possible_demote_types(&self, id: &NodeId, is_cascading: bool) -> Vec<TypeName> {
        self.resolver().get_possible_demote_types(id, is_cascading)
    }

    pub fn can_type_be_child_of_type(&self, child_type: &TypeName, parent_type: &TypeName) -> bool {
        self.resolver().can_type_be_child_of_type(child_type, parent_type)
    }

    pub fn get_allowed_child_types(&self, parent_type: &TypeName) -> Vec<TypeName> {
        self.resolver().get_allowed_child_types(parent_type)
    }

    pub fn create_work_item(&mut self, item_type: TypeName, parent_id: Option<&NodeId>, title: Option<String>) -> WorkItemNode {
        self.operations().create_work_item(item_type, parent_id, title)
    }

    pub fn add_item(&mut self, item_type: TypeName, parent_id: Option<&NodeId>, title: Option<String>) -> Vec<WorkItemNode> {
        self.operations().add_item(item_type, parent_id, title)
    }

    pub fn add_item_after(&mut self, new_item: WorkItemNode, after_id: &NodeId) -> HierarchyResult<Vec<WorkItemNode>> {
        self.operations().add_item_after(new_item, after_id)
    }

    pub fn update_item_title(&mut self, id: &NodeId, title: impl Into<String>) -> Vec<WorkItemNode> {
        self.state.update_item_title(id, title)
    }

    pub fn update_item_type(&mut self, id: &NodeId, new_type: TypeName) -> Vec<WorkItemNode> {
        self.operations().update_item_type(id, new_type)
    }

    pub fn remove_item(&mut self, id: &NodeId) -> Vec<WorkItemNode> {
        self.operations().remove_item(id)
    }

    pub fn promote_item(&mut self, id: &NodeId, type_map: Option<&TypeMap>) -> Vec<WorkItemNode> {
        self.operations().promote_item(id, type_map)
    }

    pub fn demote_item(&mut self, id: &NodeId, type_map: Option<&TypeMap>) -> Vec<WorkItemNode> {
        self.operations().demote_item(id, type_map)
    }

    /// Parse an outline and append its roots after the current forest
    ///
    /// Nothing is merged unless the parse succeeded.
    pub fn merge_parsed(&mut self, text: &str) -> ParseResult {
        let result = TextHierarchyParser::new(&self.rules).parse(
            text,
            Some(self.state.path_context()),
            self.state.root_type(),
        );
        if !result.success {
            debug!(errors = result.errors.len(), "merge_parsed: parse failed, nothing merged");
            return result;
        }

        let mut merged = 0;
        for node in result.nodes.iter().cloned() {
            match self.state.forest_mut().insert_subtree(node, None, None) {
                Ok(inserted) => {
                    self.state.update_hierarchy_count(inserted as isize);
                    merged += inserted;
                }
                Err(e) => self.state.raise_error(&format!("Failed to merge parsed item: {}", e)),
            }
        }
        recalculate_flags(&mut self.state, &self.rules);
        info!(merged, "Merged parsed outline into hierarchy");
        result
    }

    /// Parent-first creation order for the current forest
    pub fn submission_plan(&self) -> SubmissionPlan {
        SubmissionPlan::from_forest(&self.state.get_hierarchy())
    }

    fn resolver(&self) -> TypeResolver<'_> {
        TypeResolver::new(&self.state, &self.rules)
    }

    fn operations(&mut self) -> HierarchyOperations<'_> {
        HierarchyOperations::new(&mut self.state, &self.rules)
    }
}
