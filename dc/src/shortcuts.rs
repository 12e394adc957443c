//! Keyboard shortcut dispatch
//!
//! A dispatcher is built explicitly and handed to whatever owns the current
//! focus. Bindings live per named context; the active contexts form a
//! stack and lookups walk it from the top down.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{NodeId, WorkItemNode};
use crate::hierarchy::{HierarchyManager, HierarchyResult};

/// Context every dispatcher starts with
pub const TREE_CONTEXT: &str = "tree";

/// Hierarchy action a key can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HierarchyCommand {
    /// Append a child of the first legal type under the focused node
    AddChild,
    /// Insert a sibling right after the focused node
    AddSibling,
    Remove,
    Promote,
    Demote,
}

impl HierarchyCommand {
    /// Name as written in config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddChild => "add-child",
            Self::AddSibling => "add-sibling",
            Self::Remove => "remove",
            Self::Promote => "promote",
            Self::Demote => "demote",
        }
    }
}

impl std::fmt::Display for HierarchyCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bindings of normalized key chords to commands, per context
pub type BindingMap = BTreeMap<String, BTreeMap<String, HierarchyCommand>>;

#[derive(Debug, Clone, Default)]
pub struct ShortcutDispatcher {
    bindings: HashMap<String, HashMap<String, HierarchyCommand>>,
    stack: Vec<String>,
}

impl ShortcutDispatcher {
    /// Empty dispatcher with the tree context active
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            stack: vec![TREE_CONTEXT.to_string()],
        }
    }

    /// Dispatcher with the stock tree bindings
    pub fn with_defaults() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.bind(TREE_CONTEXT, "enter", HierarchyCommand::AddSibling);
        dispatcher.bind(TREE_CONTEXT, "ctrl+enter", HierarchyCommand::AddChild);
        dispatcher.bind(TREE_CONTEXT, "delete", HierarchyCommand::Remove);
        dispatcher.bind(TREE_CONTEXT, "tab", HierarchyCommand::Demote);
        dispatcher.bind(TREE_CONTEXT, "shift+tab", HierarchyCommand::Promote);
        dispatcher
    }

    /// Stock bindings overlaid with configured ones
    pub fn from_bindings(bindings: &BindingMap) -> Self {
        let mut dispatcher = Self::with_defaults();
        for (context, keys) in bindings {
            for (key, command) in keys {
                dispatcher.bind(context, key, *command);
            }
        }
        dispatcher
    }

    pub fn bind(&mut self, context: &str, key: &str, command: HierarchyCommand) {
        debug!(context, key, ?command, "bind: called");
        self.bindings
            .entry(context.to_string())
            .or_default()
            .insert(normalize_key(key), command);
    }

    /// Every binding as `(context, key, command)`, sorted by context then key
    pub fn bindings(&self) -> Vec<(&str, &str, HierarchyCommand)> {
        let mut out: Vec<(&str, &str, HierarchyCommand)> = self
            .bindings
            .iter()
            .flat_map(|(context, keys)| keys.iter().map(move |(key, command)| (context.as_str(), key.as_str(), *command)))
            .collect();
        out.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        out
    }

    pub fn push_context(&mut self, context: impl Into<String>) {
        let context = context.into();
        debug!(%context, "push_context: called");
        self.stack.push(context);
    }

    /// Pop the top context; the bottom one is never removed
    pub fn pop_context(&mut self) -> Option<String> {
        if self.stack.len() <= 1 {
            return None;
        }
        let popped = self.stack.pop();
        debug!(?popped, "pop_context: called");
        popped
    }

    pub fn active_context(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    /// First binding for `key`, searching from the top of the stack down
    pub fn resolve(&self, key: &str) -> Option<HierarchyCommand> {
        let key = normalize_key(key);
        self.stack
            .iter()
            .rev()
            .find_map(|context| self.bindings.get(context).and_then(|keys| keys.get(&key)).copied())
    }

    /// Run the command bound to `key` against the focused node
    ///
    /// Returns `Ok(None)` when the key is unbound, or when the command needs
    /// a focused node and there is none.
    pub fn dispatch(
        &self,
        key: &str,
        manager: &mut HierarchyManager,
        focused: Option<&NodeId>,
    ) -> HierarchyResult<Option<Vec<WorkItemNode>>> {
        let Some(command) = self.resolve(key) else {
            debug!(key, "dispatch: unbound key");
            return Ok(None);
        };
        debug!(key, ?command, ?focused, "dispatch: called");

        let forest = match (command, focused) {
            (HierarchyCommand::AddChild, parent) => {
                let Some(item_type) = manager.get_possible_child_types(parent).into_iter().next() else {
                    return Ok(None);
                };
                manager.add_item(item_type, parent, None)
            }
            (HierarchyCommand::AddSibling, None) => {
                let Some(item_type) = manager.get_possible_child_types(None).into_iter().next() else {
                    return Ok(None);
                };
                manager.add_item(item_type, None, None)
            }
            (HierarchyCommand::AddSibling, Some(id)) => {
                let Some(anchor) = manager.find_node_by_id(id) else {
                    return Ok(None);
                };
                let parent = anchor.parent_id.clone();
                let item_type = manager
                    .get_possible_child_types(parent.as_ref())
                    .into_iter()
                    .next()
                    .unwrap_or(anchor.item_type);
                let sibling = manager.create_work_item(item_type, parent.as_ref(), None);
                manager.add_item_after(sibling, id)?
            }
            (_, None) => return Ok(None),
            (HierarchyCommand::Remove, Some(id)) => manager.remove_item(id),
            (HierarchyCommand::Promote, Some(id)) => manager.promote_item(id, None),
            (HierarchyCommand::Demote, Some(id)) => manager.demote_item(id, None),
        };
        Ok(Some(forest))
    }
}

/// Lowercase and strip spaces, so `Shift + Tab` matches `shift+tab`
fn normalize_key(key: &str) -> String {
    key.chars().filter(|c| !c.is_whitespace()).flat_map(char::to_lowercase).collect()
}
