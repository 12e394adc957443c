//! Draft hierarchy engine
//!
//! HierarchyState owns an id-keyed forest of draft work items. The type
//! resolver answers what may go where, the operations engine applies
//! add/remove/promote/demote, and HierarchyManager ties them together.

mod error;
pub mod finder;
mod flags;
mod forest;
mod manager;
mod operations;
mod state;
mod submission;
mod types;

pub use error::{HierarchyError, HierarchyResult};
pub use flags::{can_demote, can_promote, recalculate_flags};
pub use forest::{Forest, Slot};
pub use manager::HierarchyManager;
pub use operations::HierarchyOperations;
pub use state::{ErrorSink, HierarchyState};
pub use submission::{PendingWorkItem, SubmissionPlan};
pub use types::{TypeMap, TypeResolver, apply_type_map_to_affected_nodes, recursively_update_type_and_children};
