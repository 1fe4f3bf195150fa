//! Workflow execution engine
//!
//! The engine module provides the [`WorkflowRunner`] that drives bursts of
//! execution, the transient [`WorkflowExecutionContext`] it owns per run,
//! the [`WorkflowRegistry`] that resolves blueprints, and the
//! context-fidelity orchestration around the user workflow context.

mod context;
mod fidelity;
mod registry;
mod runner;

pub use context::WorkflowExecutionContext;
pub use fidelity::ContextFidelityManager;
pub use registry::{
    NullWorkflowSettingsProvider, ProgrammaticWorkflowProvider, RegistryError, WorkflowProvider,
    WorkflowRegistry, WorkflowSettingsProvider,
};
pub use runner::{RunOptions, RunnerConfig, RunnerError, WorkflowRunner};
