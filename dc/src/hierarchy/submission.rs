//! Submission planning
//!
//! Flattens a finished draft forest into the order the backing system needs:
//! every parent before its children. The network side is not handled here.

use serde::Serialize;

use crate::domain::{NodeId, PathContext, TypeName, WorkItemNode};

/// One work item ready to be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingWorkItem {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    #[serde(rename = "type")]
    pub item_type: TypeName,
    pub title: String,
    pub depth: usize,
    pub path: PathContext,
}

/// Parent-first list of items to create
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionPlan {
    pub items: Vec<PendingWorkItem>,
}

impl SubmissionPlan {
    /// Flatten a forest depth-first, parents before children
    pub fn from_forest(nodes: &[WorkItemNode]) -> Self {
        let mut items = Vec::new();
        for node in nodes {
            flatten(node, None, 0, &mut items);
        }
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Split into batches of at most `size` items
    ///
    /// Batches are grouped by depth, so every child lands in a strictly
    /// later batch than its parent and a batch can be sent concurrently.
    pub fn batches(&self, size: usize) -> Vec<Vec<&PendingWorkItem>> {
        let size = size.max(1);
        let max_depth = self.items.iter().map(|i| i.depth).max();
        let mut out = Vec::new();
        for depth in 0..=max_depth.unwrap_or(0) {
            let level: Vec<&PendingWorkItem> = self.items.iter().filter(|i| i.depth == depth).collect();
            for chunk in level.chunks(size) {
                out.push(chunk.to_vec());
            }
        }
        out
    }
}

fn flatten(node: &WorkItemNode, parent: Option<&NodeId>, depth: usize, out: &mut Vec<PendingWorkItem>) {
    out.push(PendingWorkItem {
        id: node.id.clone(),
        parent_id: parent.cloned(),
        item_type: node.item_type.clone(),
        title: node.title.clone(),
        depth,
        path: node.path.clone(),
    });
    for child in &node.children {
        flatten(child, Some(&node.id), depth + 1, out);
    }
}
