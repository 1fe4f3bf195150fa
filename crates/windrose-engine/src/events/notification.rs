//! Lifecycle notifications
//!
//! Snapshots of run state published through the mediator. Within one run
//! the order is: zero or more (ActivityExecuting, ActivityExecuted)
//! pairs, then WorkflowExecuted, then at most one terminal status
//! notification.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::WorkflowStatus;

/// A lifecycle notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A workflow's settings were consulted at listing time
    WorkflowSettingsLoaded {
        definition_id: String,
        version: i32,
        is_disabled: bool,
    },

    /// An activity is about to have its result applied
    ActivityExecuting {
        workflow_instance_id: Uuid,
        definition_id: String,
        activity_id: String,
        activity_type: String,

        /// Whether this dispatch resumed the activity
        resuming: bool,
    },

    /// An activity's result has been applied
    ActivityExecuted {
        workflow_instance_id: Uuid,
        definition_id: String,
        activity_id: String,
        activity_type: String,
    },

    /// A run finished, whatever the outcome
    WorkflowExecuted {
        workflow_instance_id: Uuid,
        definition_id: String,
        status: WorkflowStatus,
    },

    WorkflowCancelled {
        workflow_instance_id: Uuid,
        definition_id: String,
    },

    WorkflowCompleted {
        workflow_instance_id: Uuid,
        definition_id: String,
    },

    WorkflowFaulted {
        workflow_instance_id: Uuid,
        definition_id: String,
    },

    WorkflowSuspended {
        workflow_instance_id: Uuid,
        definition_id: String,
    },
}

impl Notification {
    /// Stable kind name, matching the serialized tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WorkflowSettingsLoaded { .. } => "workflow_settings_loaded",
            Self::ActivityExecuting { .. } => "activity_executing",
            Self::ActivityExecuted { .. } => "activity_executed",
            Self::WorkflowExecuted { .. } => "workflow_executed",
            Self::WorkflowCancelled { .. } => "workflow_cancelled",
            Self::WorkflowCompleted { .. } => "workflow_completed",
            Self::WorkflowFaulted { .. } => "workflow_faulted",
            Self::WorkflowSuspended { .. } => "workflow_suspended",
        }
    }

    /// The activity id, for activity-level notifications
    pub fn activity_id(&self) -> Option<&str> {
        match self {
            Self::ActivityExecuting { activity_id, .. }
            | Self::ActivityExecuted { activity_id, .. } => Some(activity_id),
            _ => None,
        }
    }
}
