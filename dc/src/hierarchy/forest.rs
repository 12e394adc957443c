//! Arena storage for the live draft forest
//!
//! Nodes live in a flat table keyed by ID. Each slot records its parent and
//! its ordered children; both sides of that edge are private to this module
//! and change together in `attach`/`detach`, so a parent reference always
//! matches exactly one children membership.

use std::collections::HashMap;

use tracing::debug;

use super::error::{HierarchyError, HierarchyResult};
use super::finder;
use crate::domain::{NodeId, PathContext, TypeName, WorkItemNode};

/// A node in the arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    id: NodeId,
    pub(crate) title: String,
    pub(crate) item_type: TypeName,
    pub(crate) path: PathContext,
    pub(crate) can_promote: bool,
    pub(crate) can_demote: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Slot {
    fn from_node(node: &WorkItemNode) -> Self {
        Self {
            id: node.id.clone(),
            title: node.title.clone(),
            item_type: node.item_type.clone(),
            path: node.path.clone(),
            can_promote: node.can_promote,
            can_demote: node.can_demote,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn item_type(&self) -> &TypeName {
        &self.item_type
    }

    pub fn path(&self) -> &PathContext {
        &self.path
    }

    pub fn parent(&self) -> Option<&NodeId> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn can_promote(&self) -> bool {
        self.can_promote
    }

    pub fn can_demote(&self) -> bool {
        self.can_demote
    }
}

/// The ordered forest of draft nodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    /// All nodes indexed by ID
    nodes: HashMap<NodeId, Slot>,
    /// Root node IDs in display order
    roots: Vec<NodeId>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a forest from nested nodes
    ///
    /// Parent references are taken from the nesting; any `parent_id` on the
    /// input is ignored.
    pub fn from_nodes(nodes: Vec<WorkItemNode>) -> HierarchyResult<Self> {
        let mut forest = Self::new();
        for node in nodes {
            forest.insert_subtree(node, None, None)?;
        }
        Ok(forest)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&Slot> {
        self.nodes.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &NodeId) -> Option<&mut Slot> {
        self.nodes.get_mut(id)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// The sibling list a node under `parent` belongs to
    pub fn siblings(&self, parent: Option<&NodeId>) -> &[NodeId] {
        match parent {
            None => &self.roots,
            Some(parent_id) => self.nodes.get(parent_id).map(|p| p.children.as_slice()).unwrap_or(&[]),
        }
    }

    /// Index of a node within its sibling list
    pub fn index_of(&self, id: &NodeId) -> Option<usize> {
        let slot = self.nodes.get(id)?;
        self.siblings(slot.parent.as_ref()).iter().position(|s| s == id)
    }

    /// The sibling immediately before a node, if any
    pub fn preceding_sibling(&self, id: &NodeId) -> Option<&NodeId> {
        let slot = self.nodes.get(id)?;
        let siblings = self.siblings(slot.parent.as_ref());
        let index = siblings.iter().position(|s| s == id)?;
        index.checked_sub(1).and_then(|i| siblings.get(i))
    }

    /// Siblings positioned after a node, in order
    pub fn following_siblings(&self, id: &NodeId) -> Vec<NodeId> {
        let Some(slot) = self.nodes.get(id) else {
            return Vec::new();
        };
        let siblings = self.siblings(slot.parent.as_ref());
        match siblings.iter().position(|s| s == id) {
            Some(index) => siblings[index + 1..].to_vec(),
            None => Vec::new(),
        }
    }

    /// Insert a nested node and all its descendants
    ///
    /// `index` of `None` appends. Returns the number of nodes inserted.
    pub fn insert_subtree(
        &mut self,
        node: WorkItemNode,
        parent: Option<&NodeId>,
        index: Option<usize>,
    ) -> HierarchyResult<usize> {
        if let Some(parent_id) = parent
            && !self.nodes.contains_key(parent_id)
        {
            return Err(HierarchyError::ParentNotFound {
                node: node.id.clone(),
                parent: parent_id.clone(),
            });
        }
        let mut seen = Vec::new();
        collect_ids(&node, &mut seen);
        for id in &seen {
            if self.nodes.contains_key(id) || seen.iter().filter(|other| *other == id).count() > 1 {
                return Err(HierarchyError::DuplicateNode(id.clone()));
            }
        }

        let id = node.id.clone();
        self.store_detached(node);
        self.attach(&id, parent, index)?;
        debug!(%id, inserted = seen.len(), "Forest::insert_subtree: complete");
        Ok(seen.len())
    }

    fn store_detached(&mut self, node: WorkItemNode) {
        let mut slot = Slot::from_node(&node);
        for child in node.children {
            let child_id = child.id.clone();
            self.store_detached(child);
            if let Some(child_slot) = self.nodes.get_mut(&child_id) {
                child_slot.parent = Some(slot.id.clone());
            }
            slot.children.push(child_id);
        }
        self.nodes.insert(slot.id.clone(), slot);
    }

    /// Remove a node from its sibling list without dropping it
    ///
    /// The node keeps its subtree. It must be re-attached before the
    /// current operation finishes.
    pub(crate) fn detach(&mut self, id: &NodeId) -> HierarchyResult<()> {
        let parent = self
            .nodes
            .get(id)
            .ok_or_else(|| HierarchyError::NodeNotFound(id.clone()))?
            .parent
            .clone();
        match &parent {
            None => self.roots.retain(|r| r != id),
            Some(parent_id) => {
                if let Some(parent_slot) = self.nodes.get_mut(parent_id) {
                    parent_slot.children.retain(|c| c != id);
                }
            }
        }
        if let Some(slot) = self.nodes.get_mut(id) {
            slot.parent = None;
        }
        Ok(())
    }

    /// Place a node (and its subtree) under `parent` at `index`
    ///
    /// A node that is already attached is detached first. Rejects moves that
    /// would make a node its own ancestor.
    pub(crate) fn attach(&mut self, id: &NodeId, parent: Option<&NodeId>, index: Option<usize>) -> HierarchyResult<()> {
        if !self.nodes.contains_key(id) {
            return Err(HierarchyError::NodeNotFound(id.clone()));
        }
        if let Some(parent_id) = parent {
            if !self.nodes.contains_key(parent_id) {
                return Err(HierarchyError::ParentNotFound {
                    node: id.clone(),
                    parent: parent_id.clone(),
                });
            }
            if parent_id == id || finder::is_descendant(self, id, parent_id) {
                return Err(HierarchyError::CycleDetected {
                    node: id.clone(),
                    parent: parent_id.clone(),
                });
            }
        }

        self.detach(id)?;

        let list = match parent {
            None => &mut self.roots,
            Some(parent_id) => match self.nodes.get_mut(parent_id) {
                Some(parent_slot) => &mut parent_slot.children,
                None => {
                    return Err(HierarchyError::ParentNotFound {
                        node: id.clone(),
                        parent: parent_id.clone(),
                    });
                }
            },
        };
        let index = index.unwrap_or(list.len()).min(list.len());
        list.insert(index, id.clone());

        if let Some(slot) = self.nodes.get_mut(id) {
            slot.parent = parent.cloned();
        }
        Ok(())
    }

    /// Remove a node and its entire subtree
    ///
    /// Returns the number of nodes removed.
    pub(crate) fn remove_subtree(&mut self, id: &NodeId) -> HierarchyResult<usize> {
        self.detach(id)?;
        let ids = finder::subtree_ids(self, id);
        for removed in &ids {
            self.nodes.remove(removed);
        }
        debug!(%id, removed = ids.len(), "Forest::remove_subtree: complete");
        Ok(ids.len())
    }

    /// Nested copy of one node and its subtree
    pub fn snapshot_node(&self, id: &NodeId) -> Option<WorkItemNode> {
        let slot = self.nodes.get(id)?;
        Some(WorkItemNode {
            id: slot.id.clone(),
            title: slot.title.clone(),
            item_type: slot.item_type.clone(),
            children: slot.children.iter().filter_map(|c| self.snapshot_node(c)).collect(),
            parent_id: slot.parent.clone(),
            can_promote: slot.can_promote,
            can_demote: slot.can_demote,
            path: slot.path.clone(),
        })
    }

    /// Nested copy of the whole forest
    pub fn snapshot(&self) -> Vec<WorkItemNode> {
        self.roots.iter().filter_map(|r| self.snapshot_node(r)).collect()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }
}

fn collect_ids(node: &WorkItemNode, out: &mut Vec<NodeId>) {
    out.push(node.id.clone());
    for child in &node.children {
        collect_ids(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_node(id: &str, item_type: &str, children: Vec<WorkItemNode>) -> WorkItemNode {
        let mut node = WorkItemNode::new(TypeName::new(item_type).unwrap(), Some(id.to_string()), PathContext::default());
        node.id = NodeId::from(id);
        node.children = children;
        node
    }

    fn sample() -> Forest {
        Forest::from_nodes(vec![
            make_node(
                "epic",
                "Epic",
                vec![
                    make_node("f1", "Feature", vec![make_node("t1", "Task", vec![])]),
                    make_node("f2", "Feature", vec![]),
                ],
            ),
            make_node("epic2", "Epic", vec![]),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_nodes_links_parents() {
        let forest = sample();
        assert_eq!(forest.len(), 5);
        assert_eq!(forest.roots(), &[NodeId::from("epic"), NodeId::from("epic2")]);
        assert_eq!(forest.get(&"t1".into()).unwrap().parent(), Some(&NodeId::from("f1")));
        assert_eq!(forest.get(&"epic".into()).unwrap().parent(), None);
    }

    #[test]
    fn test_siblings_and_positions() {
        let forest = sample();
        assert_eq!(forest.index_of(&"f2".into()), Some(1));
        assert_eq!(forest.preceding_sibling(&"f2".into()), Some(&NodeId::from("f1")));
        assert_eq!(forest.preceding_sibling(&"f1".into()), None);
        assert_eq!(forest.following_siblings(&"f1".into()), vec![NodeId::from("f2")]);
        assert!(forest.following_siblings(&"f2".into()).is_empty());
        assert_eq!(forest.preceding_sibling(&"epic2".into()), Some(&NodeId::from("epic")));
    }

    #[test]
    fn test_attach_moves_node() {
        let mut forest = sample();
        forest.attach(&"f2".into(), Some(&"f1".into()), None).unwrap();

        let f1 = forest.get(&"f1".into()).unwrap();
        assert_eq!(f1.children(), &[NodeId::from("t1"), NodeId::from("f2")]);
        assert_eq!(forest.get(&"epic".into()).unwrap().children(), &[NodeId::from("f1")]);
        assert_eq!(forest.get(&"f2".into()).unwrap().parent(), Some(&NodeId::from("f1")));
    }

    #[test]
    fn test_attach_rejects_cycle() {
        let mut forest = sample();
        let before = forest.clone();

        let err = forest.attach(&"epic".into(), Some(&"t1".into()), None).unwrap_err();
        assert!(matches!(err, HierarchyError::CycleDetected { .. }));
        let err = forest.attach(&"f1".into(), Some(&"f1".into()), None).unwrap_err();
        assert!(matches!(err, HierarchyError::CycleDetected { .. }));
        assert_eq!(forest, before);
    }

    #[test]
    fn test_attach_at_index() {
        let mut forest = sample();
        forest.attach(&"epic2".into(), None, Some(0)).unwrap();
        assert_eq!(forest.roots(), &[NodeId::from("epic2"), NodeId::from("epic")]);
    }

    #[test]
    fn test_remove_subtree_counts() {
        let mut forest = sample();
        let removed = forest.remove_subtree(&"f1".into()).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(forest.len(), 3);
        assert!(!forest.contains(&"t1".into()));
        assert_eq!(forest.get(&"epic".into()).unwrap().children(), &[NodeId::from("f2")]);
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut forest = sample();
        let err = forest
            .insert_subtree(make_node("f1", "Feature", vec![]), None, None)
            .unwrap_err();
        assert_eq!(err, HierarchyError::DuplicateNode("f1".into()));

        let err = forest
            .insert_subtree(
                make_node("x", "Feature", vec![make_node("x", "Task", vec![])]),
                None,
                None,
            )
            .unwrap_err();
        assert_eq!(err, HierarchyError::DuplicateNode("x".into()));
        assert_eq!(forest.len(), 5);
    }

    #[test]
    fn test_insert_under_missing_parent() {
        let mut forest = sample();
        let err = forest
            .insert_subtree(make_node("x", "Task", vec![]), Some(&"nope".into()), None)
            .unwrap_err();
        assert!(matches!(err, HierarchyError::ParentNotFound { .. }));
        assert_eq!(forest.len(), 5);
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let forest = sample();
        let mut snapshot = forest.snapshot();
        snapshot[0].title = "changed".to_string();
        snapshot[0].children.clear();

        assert_eq!(forest.get(&"epic".into()).unwrap().title(), "epic");
        assert_eq!(forest.snapshot()[0].children.len(), 2);
        assert_eq!(forest.snapshot()[0].children[0].parent_id, Some(NodeId::from("epic")));
    }
}
