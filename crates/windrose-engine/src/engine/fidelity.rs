//! Context-fidelity orchestration
//!
//! Decides when the user workflow-context value is loaded and saved
//! around execution: once per burst (`Burst`) or around every dispatch
//! (`Activity`). Loading and saving delegate to the external
//! [`WorkflowContextManager`]; failures are logged and never stop a run.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::blueprint::Blueprint;
use crate::persistence::WorkflowContextManager;
use crate::workflow::{ContextFidelity, WorkflowInstance};

/// Applies the declared fidelity policy around the runner's dispatches
pub struct ContextFidelityManager {
    manager: Arc<dyn WorkflowContextManager>,
}

impl ContextFidelityManager {
    pub fn new(manager: Arc<dyn WorkflowContextManager>) -> Self {
        Self { manager }
    }

    /// Load the workflow-context value at a `fidelity` boundary
    ///
    /// Skips (returns `None`) when the blueprint declares no context
    /// options, when the declared fidelity differs, or when the instance
    /// has no context id yet. A manager failure is logged and the run
    /// continues without a context value.
    pub async fn load(
        &self,
        fidelity: ContextFidelity,
        blueprint: &Blueprint,
        instance: &WorkflowInstance,
    ) -> Option<Value> {
        if blueprint.context_fidelity() != Some(fidelity) {
            return None;
        }
        if instance.context_id.is_none() {
            return None;
        }

        match self.manager.load_context(blueprint, instance).await {
            Ok(value) => value,
            Err(error) => {
                warn!(
                    workflow_instance_id = %instance.id,
                    %error,
                    "workflow context load failed; continuing without context"
                );
                None
            }
        }
    }

    /// Save the workflow-context value at a `fidelity` boundary
    ///
    /// On success the returned context id is written onto the instance;
    /// on failure the previous context id is retained.
    pub async fn save(
        &self,
        fidelity: ContextFidelity,
        blueprint: &Blueprint,
        instance: &mut WorkflowInstance,
        value: Option<&Value>,
    ) {
        if blueprint.context_fidelity() != Some(fidelity) {
            return;
        }

        match self.manager.save_context(blueprint, instance, value).await {
            Ok(Some(context_id)) => instance.context_id = Some(context_id),
            Ok(None) => {}
            Err(error) => {
                warn!(
                    workflow_instance_id = %instance.id,
                    %error,
                    "workflow context save failed; retaining previous context id"
                );
            }
        }
    }
}
