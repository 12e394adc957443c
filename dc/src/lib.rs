//! Decomposer - draft work item hierarchies
//!
//! Breaks one parent work item into a tree of draft child items before
//! anything is created in the backing tracker.
//!
//! # Modules
//!
//! - [`domain`] - node ids, type names and the `WorkItemNode` shape
//! - [`rules`] - type to allowed-child-types configuration
//! - [`hierarchy`] - state store, type resolver, operations and the
//!   [`HierarchyManager`] facade
//! - [`parser`] - `Type: Title` outline parsing and rendering
//! - [`shortcuts`] - key binding dispatch onto hierarchy commands
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod hierarchy;
pub mod parser;
pub mod rules;
pub mod shortcuts;

pub use domain::{NodeId, PathContext, TypeName, WorkItemNode};
pub use hierarchy::{HierarchyError, HierarchyManager, HierarchyResult, SubmissionPlan, TypeMap};
pub use parser::{ParseIssue, ParseResult, TextHierarchyParser, parse_work_item_text, render_outline};
pub use rules::{TypeDefinition, TypeRules};
pub use shortcuts::{HierarchyCommand, ShortcutDispatcher};
