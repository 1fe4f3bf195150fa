//! Workflow definitions and instances
//!
//! This module contains the two durable workflow shapes:
//! - [`WorkflowDefinition`] - the serialized graph a registry hands out
//! - [`WorkflowInstance`] - the per-run record persisted between bursts

mod definition;
mod instance;

pub use definition::{
    ActivityDefinition, ConnectionDefinition, ContextFidelity, ContextOptions,
    PersistenceBehavior, PropertyDefinition, Variables, WorkflowDefinition,
};
pub use instance::{
    BlockingActivity, ExecutionLogEntry, ScheduledActivity, WorkflowFactory, WorkflowFault,
    WorkflowInstance, WorkflowStatus,
};
