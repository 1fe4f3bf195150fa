//! Persistence ports
//!
//! The engine never persists anything itself; these are the seams a host
//! plugs its storage into:
//! - [`WorkflowInstanceStore`] for the durable per-run records
//! - [`WorkflowContextManager`] for the user workflow-context payload
//!
//! In-memory implementations are provided for tests and simple hosts.

mod context;
mod memory;
mod store;

pub use context::{
    ContextError, InMemoryWorkflowContextManager, NullWorkflowContextManager,
    WorkflowContextManager,
};
pub use memory::InMemoryWorkflowInstanceStore;
pub use store::{StoreError, WorkflowInstanceStore};
