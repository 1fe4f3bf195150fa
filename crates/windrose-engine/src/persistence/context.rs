//! Workflow-context manager port
//!
//! The user workflow context is a caller-supplied payload tied to an
//! instance via `context_id`, distinct from the engine's own execution
//! context. The manager loads and saves it around bursts or individual
//! activities, depending on the declared fidelity.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::blueprint::Blueprint;
use crate::workflow::WorkflowInstance;

/// Error type for context-manager operations
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("workflow context load failed: {0}")]
    Load(String),

    #[error("workflow context save failed: {0}")]
    Save(String),
}

/// Loads and saves the user workflow-context value
///
/// `save_context` returns the context id under which the value was
/// stored, or `None` when nothing was stored; the runner writes a
/// returned id back onto the instance so later runs can rehydrate.
#[async_trait]
pub trait WorkflowContextManager: Send + Sync + 'static {
    async fn load_context(
        &self,
        blueprint: &Blueprint,
        instance: &WorkflowInstance,
    ) -> Result<Option<Value>, ContextError>;

    async fn save_context(
        &self,
        blueprint: &Blueprint,
        instance: &WorkflowInstance,
        value: Option<&Value>,
    ) -> Result<Option<String>, ContextError>;
}

/// Context manager that stores nothing
///
/// The default for workflows without context options.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullWorkflowContextManager;

impl NullWorkflowContextManager {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WorkflowContextManager for NullWorkflowContextManager {
    async fn load_context(
        &self,
        _blueprint: &Blueprint,
        _instance: &WorkflowInstance,
    ) -> Result<Option<Value>, ContextError> {
        Ok(None)
    }

    async fn save_context(
        &self,
        _blueprint: &Blueprint,
        _instance: &WorkflowInstance,
        _value: Option<&Value>,
    ) -> Result<Option<String>, ContextError> {
        Ok(None)
    }
}

/// In-memory implementation of WorkflowContextManager
///
/// Stores context values keyed by context id; primarily for testing.
#[derive(Default)]
pub struct InMemoryWorkflowContextManager {
    values: RwLock<HashMap<String, Value>>,
}

impl InMemoryWorkflowContextManager {
    /// Create a new empty manager
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a context value under a known id (for testing)
    pub fn insert(&self, context_id: impl Into<String>, value: Value) {
        self.values.write().insert(context_id.into(), value);
    }

    /// Read a stored context value
    pub fn get(&self, context_id: &str) -> Option<Value> {
        self.values.read().get(context_id).cloned()
    }

    /// Number of stored context values
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Check whether the manager is empty
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

#[async_trait]
impl WorkflowContextManager for InMemoryWorkflowContextManager {
    async fn load_context(
        &self,
        _blueprint: &Blueprint,
        instance: &WorkflowInstance,
    ) -> Result<Option<Value>, ContextError> {
        let Some(context_id) = &instance.context_id else {
            return Ok(None);
        };

        Ok(self.values.read().get(context_id).cloned())
    }

    async fn save_context(
        &self,
        _blueprint: &Blueprint,
        instance: &WorkflowInstance,
        value: Option<&Value>,
    ) -> Result<Option<String>, ContextError> {
        let Some(value) = value else {
            return Ok(None);
        };

        let context_id = instance
            .context_id
            .clone()
            .unwrap_or_else(|| Uuid::now_v7().to_string());

        self.values
            .write()
            .insert(context_id.clone(), value.clone());

        Ok(Some(context_id))
    }
}
