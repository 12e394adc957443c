//! Draft work item nodes
//!
//! `WorkItemNode` is the nested, owned shape handed to callers. The engine
//! keeps its live state in an arena (see `hierarchy::Forest`) and only
//! builds these at the public boundary, so mutating a returned node never
//! touches engine state.

use serde::{Deserialize, Serialize};

use super::id::NodeId;
use super::type_name::{TypeName, fold_case};

/// Locational context inherited from the item being decomposed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathContext {
    /// Area path of the parent item
    #[serde(rename = "area-path", skip_serializing_if = "Option::is_none")]
    pub area_path: Option<String>,

    /// Iteration path of the parent item
    #[serde(rename = "iteration-path", skip_serializing_if = "Option::is_none")]
    pub iteration_path: Option<String>,
}

impl PathContext {
    pub fn new(area_path: Option<String>, iteration_path: Option<String>) -> Self {
        Self {
            area_path,
            iteration_path,
        }
    }
}

/// A draft unit of work and its owned subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemNode {
    pub id: NodeId,
    pub title: String,
    #[serde(rename = "type")]
    pub item_type: TypeName,
    #[serde(default)]
    pub children: Vec<WorkItemNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub can_promote: bool,
    #[serde(default)]
    pub can_demote: bool,
    #[serde(default)]
    pub path: PathContext,
}

impl WorkItemNode {
    /// Create a detached node with a fresh ID
    ///
    /// The title defaults to `"New <type>"` when not given.
    pub fn new(item_type: TypeName, title: Option<String>, path: PathContext) -> Self {
        let title = title.unwrap_or_else(|| default_title(&item_type));
        Self {
            id: NodeId::new(),
            title,
            item_type,
            children: Vec::new(),
            parent_id: None,
            can_promote: false,
            can_demote: false,
            path,
        }
    }

    /// Number of nodes in this subtree, including self
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(WorkItemNode::subtree_size).sum::<usize>()
    }
}

/// The default title convention for a type
pub fn default_title(item_type: &TypeName) -> String {
    format!("New {}", item_type)
}

/// Check whether a title is the default title for a type
///
/// Matching ignores case and surrounding whitespace.
pub fn is_default_title(title: &str, item_type: &TypeName) -> bool {
    fold_case(title) == format!("new {}", fold_case(item_type.as_str()))
}
