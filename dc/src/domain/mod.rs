//! Domain types for the decomposer
//!
//! Core domain types: NodeId, TypeName, WorkItemNode, PathContext.

mod id;
mod node;
mod type_name;

pub use id::{NodeId, generate_id};
pub use node::{PathContext, WorkItemNode, default_title, is_default_title};
pub use type_name::TypeName;
