//! Durable workflow instances
//!
//! A [`WorkflowInstance`] is the per-run record that outlives a single
//! invocation of the runner: it carries the status, variables, blocking
//! set, pending schedule, output and faults that an external store
//! persists between bursts.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::blueprint::Blueprint;

use super::definition::Variables;

/// Lifecycle status of a workflow instance
///
/// Transitions: Idle → Running on begin; Running → Suspended when blocking
/// activities remain; Running → Finished when the queue drains with no
/// blocking activities; Running → Faulted on an uncaught activity failure;
/// any non-terminal status → Cancelled on request; Suspended → Running
/// only via resume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Created but never started
    #[default]
    Idle,

    /// Actively draining the scheduled queue
    Running,

    /// Waiting for an external signal to resume a blocking activity
    Suspended,

    /// Completed successfully
    Finished,

    /// Cancelled on request
    Cancelled,

    /// Stopped by an unhandled activity failure
    Faulted,
}

impl WorkflowStatus {
    /// Whether this status ends the instance's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled | Self::Faulted)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Suspended => write!(f, "suspended"),
            Self::Finished => write!(f, "finished"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Faulted => write!(f, "faulted"),
        }
    }
}

/// An activity queued for dispatch, with its input value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledActivity {
    pub activity_id: String,
    pub input: Option<Value>,
}

impl ScheduledActivity {
    pub fn new(activity_id: impl Into<String>, input: Option<Value>) -> Self {
        Self {
            activity_id: activity_id.into(),
            input,
        }
    }
}

/// An activity waiting for an external signal
///
/// The tag records the activity type so hosts can route signals without
/// loading the blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockingActivity {
    pub activity_id: String,
    pub tag: String,
}

impl BlockingActivity {
    pub fn new(activity_id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            activity_id: activity_id.into(),
            tag: tag.into(),
        }
    }
}

/// A recorded activity failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowFault {
    /// Human-readable failure message
    pub message: String,

    /// The activity that failed, when attributable
    pub activity_id: Option<String>,

    /// When the fault was recorded
    pub faulted_at: DateTime<Utc>,
}

impl WorkflowFault {
    pub fn new(message: impl Into<String>, activity_id: Option<String>) -> Self {
        Self {
            message: message.into(),
            activity_id,
            faulted_at: Utc::now(),
        }
    }
}

/// Append-only record of one executed activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub activity_id: String,
    pub activity_type: String,
    pub timestamp: DateTime<Utc>,
}

/// The durable per-run record
///
/// Mutated only through the workflow execution context during a run; at
/// rest it is the unit an external instance store persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Unique instance id
    pub id: Uuid,

    /// The definition this instance was created from
    pub definition_id: String,

    /// The definition version this instance is pinned to
    pub version: i32,

    pub tenant_id: Option<String>,

    /// Caller-supplied correlation key
    pub correlation_id: Option<String>,

    /// Handle to the persisted user workflow-context value
    pub context_id: Option<String>,

    pub status: WorkflowStatus,

    pub variables: Variables,

    /// Activities waiting for an external signal
    pub blocking_activities: HashSet<BlockingActivity>,

    /// Activities queued but not yet dispatched
    pub scheduled_activities: VecDeque<ScheduledActivity>,

    /// The most recently dispatched activity
    pub current_activity: Option<String>,

    /// Output of the last activity that produced one
    pub output: Option<Value>,

    pub faults: Vec<WorkflowFault>,

    /// Append-only log of executed activities
    pub execution_log: Vec<ExecutionLogEntry>,

    pub created_at: DateTime<Utc>,
}

impl WorkflowInstance {
    /// Whether the instance has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Creates fresh instances from blueprints
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowFactory;

impl WorkflowFactory {
    pub fn new() -> Self {
        Self
    }

    /// Instantiate a new Idle instance of the given blueprint
    ///
    /// Variables are seeded from the blueprint's declared initial values.
    pub fn instantiate(
        &self,
        blueprint: &Blueprint,
        correlation_id: Option<String>,
        context_id: Option<String>,
    ) -> WorkflowInstance {
        WorkflowInstance {
            id: Uuid::now_v7(),
            definition_id: blueprint.definition_id.clone(),
            version: blueprint.version,
            tenant_id: None,
            correlation_id,
            context_id,
            status: WorkflowStatus::Idle,
            variables: blueprint.variables.clone(),
            blocking_activities: HashSet::new(),
            scheduled_activities: VecDeque::new(),
            current_activity: None,
            output: None,
            faults: Vec::new(),
            execution_log: Vec::new(),
            created_at: Utc::now(),
        }
    }
}
