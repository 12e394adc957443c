//! Hierarchy errors

use thiserror::Error;

use crate::domain::NodeId;

/// Errors from hierarchy operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Parent {parent} of node {node} not found")]
    ParentNotFound { node: NodeId, parent: NodeId },

    #[error("Invalid type name: {0:?}")]
    InvalidTypeName(String),

    #[error("Moving {node} under {parent} would make it its own ancestor")]
    CycleDetected { node: NodeId, parent: NodeId },

    #[error("Node already present in hierarchy: {0}")]
    DuplicateNode(NodeId),
}

/// Result of a hierarchy operation that can fail structurally
pub type HierarchyResult<T> = Result<T, HierarchyError>;
