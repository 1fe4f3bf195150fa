//! # Windrose Engine
//!
//! The execution core of a durable, graph-structured workflow engine.
//! A workflow is a directed graph of activities connected by named
//! outcomes; the engine drives an instance of such a graph from start to
//! completion, persisting enough state that execution can suspend on a
//! blocking activity and resume later, possibly in another process.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowRunner                          │
//! │  (begin/resume/continue dispatch, drain loop, events)        │
//! └─────────────────────────────────────────────────────────────┘
//!          │                     │                      │
//!          ▼                     ▼                      ▼
//! ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────┐
//! │    Blueprint     │ │ WorkflowExecution│ │     Mediator     │
//! │ (materialized    │ │     Context      │ │ (ordered fan-out │
//! │  activity graph) │ │ (queues, status, │ │  to subscribers) │
//! │                  │ │  blocking set)   │ │                  │
//! └──────────────────┘ └──────────────────┘ └──────────────────┘
//! ```
//!
//! Collaborators (the instance store, the workflow-context manager, the
//! expression evaluator and the activity container) are abstract ports
//! with in-memory implementations for tests and simple hosts.
//!
//! ## Example
//!
//! ```ignore
//! use windrose_engine::prelude::*;
//!
//! let definition = WorkflowDefinition::new("greeter", 1)
//!     .with_activity(ActivityDefinition::new("hello", "log"))
//!     .with_activity(ActivityDefinition::new("bye", "log"))
//!     .with_connection(ConnectionDefinition::new("hello", "bye", "Done"));
//!
//! let blueprint = Arc::new(materialize(&definition)?);
//! let instance = runner.run(blueprint, RunOptions::new()).await?;
//! assert_eq!(instance.status, WorkflowStatus::Finished);
//! ```

pub mod activation;
pub mod activity;
pub mod blueprint;
pub mod engine;
pub mod events;
pub mod expressions;
pub mod persistence;
pub mod workflow;

/// Prelude for common imports
pub mod prelude {
    pub use crate::activation::{ActivityRegistry, ServiceProvider, ServiceScope};
    pub use crate::activity::{
        outcome_names, Activity, ActivityError, ActivityExecutionContext, ActivityResult,
    };
    pub use crate::blueprint::{materialize, Blueprint, MaterializeError};
    pub use crate::engine::{
        ProgrammaticWorkflowProvider, RunOptions, RunnerConfig, RunnerError, WorkflowProvider,
        WorkflowRegistry, WorkflowRunner,
    };
    pub use crate::events::{Mediator, Notification, NotificationHandler, RecordingHandler};
    pub use crate::expressions::{ExpressionEvaluator, LiteralEvaluator};
    pub use crate::persistence::{
        InMemoryWorkflowContextManager, InMemoryWorkflowInstanceStore, NullWorkflowContextManager,
        WorkflowContextManager, WorkflowInstanceStore,
    };
    pub use crate::workflow::{
        ActivityDefinition, ConnectionDefinition, ContextFidelity, ContextOptions,
        PropertyDefinition, Variables, WorkflowDefinition, WorkflowInstance, WorkflowStatus,
    };
}

// Re-export key types at crate root
pub use activation::{ActivationError, ActivityRegistry, ServiceProvider, ServiceScope};
pub use activity::{Activity, ActivityError, ActivityExecutionContext, ActivityResult};
pub use blueprint::{materialize, Blueprint, MaterializeError};
pub use engine::{
    RunOptions, RunnerConfig, RunnerError, WorkflowExecutionContext, WorkflowRegistry,
    WorkflowRunner,
};
pub use events::{Mediator, Notification, NotificationHandler};
pub use expressions::{ExpressionEvaluator, LiteralEvaluator};
pub use persistence::{WorkflowContextManager, WorkflowInstanceStore};
pub use workflow::{WorkflowDefinition, WorkflowInstance, WorkflowStatus};
