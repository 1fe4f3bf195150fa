//! Workflow execution context
//!
//! The transient, runner-owned state of one run: the instance under
//! execution, its blueprint, the two scheduling queues, and the loaded
//! user workflow-context value. It lives for exactly one invocation of
//! the runner and is never shared across concurrent runs.

use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::blueprint::Blueprint;
use crate::workflow::{
    BlockingActivity, ExecutionLogEntry, ScheduledActivity, Variables, WorkflowInstance,
    WorkflowStatus,
};

/// Per-run mutable state
///
/// All mutation happens on the runner's task; the queue and state-machine
/// operations below are non-suspending.
pub struct WorkflowExecutionContext {
    blueprint: Arc<Blueprint>,
    instance: WorkflowInstance,

    /// Primary FIFO dispatch queue
    scheduled: VecDeque<ScheduledActivity>,

    /// Deferred queue, drained into the primary once it empties
    post_scheduled: VecDeque<ScheduledActivity>,

    workflow_context: Option<Value>,
    passes: usize,
}

impl WorkflowExecutionContext {
    /// Build a context for one run
    ///
    /// The primary queue is seeded from the instance's persisted schedule.
    pub fn new(blueprint: Arc<Blueprint>, mut instance: WorkflowInstance) -> Self {
        let scheduled = mem::take(&mut instance.scheduled_activities);
        Self {
            blueprint,
            instance,
            scheduled,
            post_scheduled: VecDeque::new(),
            workflow_context: None,
            passes: 0,
        }
    }

    pub fn blueprint(&self) -> &Arc<Blueprint> {
        &self.blueprint
    }

    pub fn instance(&self) -> &WorkflowInstance {
        &self.instance
    }

    pub(crate) fn instance_mut(&mut self) -> &mut WorkflowInstance {
        &mut self.instance
    }

    pub fn status(&self) -> WorkflowStatus {
        self.instance.status
    }

    // =========================================================================
    // Status transitions
    // =========================================================================

    /// Idle → Running
    pub fn begin(&mut self) {
        self.instance.status = WorkflowStatus::Running;
    }

    /// Suspended → Running
    pub fn resume(&mut self) {
        self.instance.status = WorkflowStatus::Running;
    }

    /// Running → Finished, once both queues and the blocking set are empty
    pub fn complete(&mut self) {
        self.instance.status = WorkflowStatus::Finished;
    }

    /// Running → Suspended, while blocking activities remain
    pub fn suspend(&mut self) {
        self.instance.status = WorkflowStatus::Suspended;
    }

    /// Any non-terminal → Cancelled
    pub fn cancel(&mut self) {
        self.instance.status = WorkflowStatus::Cancelled;
    }

    /// Record a fault and move to Faulted
    pub fn fault(&mut self, activity_id: Option<&str>, message: impl Into<String>) {
        self.instance.faults.push(crate::workflow::WorkflowFault::new(
            message,
            activity_id.map(str::to_string),
        ));
        self.instance.status = WorkflowStatus::Faulted;
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Append to the primary queue
    ///
    /// The same activity id may be queued more than once; re-entry is
    /// legal.
    pub fn schedule_activity(&mut self, activity_id: impl Into<String>, input: Option<Value>) {
        self.scheduled
            .push_back(ScheduledActivity::new(activity_id, input));
    }

    /// Append to the post-scheduled queue
    pub fn schedule_post_activity(&mut self, activity_id: impl Into<String>, input: Option<Value>) {
        self.post_scheduled
            .push_back(ScheduledActivity::new(activity_id, input));
    }

    /// Remove and return the head of the primary queue
    pub fn pop_scheduled_activity(&mut self) -> Option<ScheduledActivity> {
        self.scheduled.pop_front()
    }

    /// Move everything from the post-scheduled queue onto the primary
    pub fn schedule_post_activities(&mut self) {
        self.scheduled.append(&mut self.post_scheduled);
    }

    pub fn has_scheduled_activities(&self) -> bool {
        !self.scheduled.is_empty()
    }

    pub fn has_post_scheduled_activities(&self) -> bool {
        !self.post_scheduled.is_empty()
    }

    /// Mark the end of one dispatch pass
    pub fn complete_pass(&mut self) {
        self.passes += 1;
    }

    /// Number of completed dispatch passes this run
    pub fn passes(&self) -> usize {
        self.passes
    }

    // =========================================================================
    // Blocking set
    // =========================================================================

    pub fn add_blocking(&mut self, activity_id: impl Into<String>, tag: impl Into<String>) {
        self.instance
            .blocking_activities
            .insert(BlockingActivity::new(activity_id, tag));
    }

    /// Remove every blocking entry for the given activity id
    pub fn remove_blocking(&mut self, activity_id: &str) {
        self.instance
            .blocking_activities
            .retain(|blocking| blocking.activity_id != activity_id);
    }

    pub fn has_blocking_activities(&self) -> bool {
        !self.instance.blocking_activities.is_empty()
    }

    pub fn blocking_contains(&self, activity_id: &str) -> bool {
        self.instance
            .blocking_activities
            .iter()
            .any(|blocking| blocking.activity_id == activity_id)
    }

    // =========================================================================
    // Run data
    // =========================================================================

    pub fn workflow_context(&self) -> Option<&Value> {
        self.workflow_context.as_ref()
    }

    pub fn set_workflow_context(&mut self, value: Option<Value>) {
        self.workflow_context = value;
    }

    pub(crate) fn take_workflow_context(&mut self) -> Option<Value> {
        self.workflow_context.take()
    }

    pub(crate) fn take_variables(&mut self) -> Variables {
        mem::take(&mut self.instance.variables)
    }

    pub(crate) fn put_variables(&mut self, variables: Variables) {
        self.instance.variables = variables;
    }

    /// Set the workflow's pending output
    pub fn set_output(&mut self, value: Value) {
        self.instance.output = Some(value);
    }

    pub fn set_current_activity(&mut self, activity_id: impl Into<String>) {
        self.instance.current_activity = Some(activity_id.into());
    }

    /// Append an execution-log entry for a dispatched activity
    pub fn append_log(&mut self, activity_id: impl Into<String>, activity_type: impl Into<String>) {
        self.instance.execution_log.push(ExecutionLogEntry {
            activity_id: activity_id.into(),
            activity_type: activity_type.into(),
            timestamp: Utc::now(),
        });
    }

    /// Consume the context, writing run state back onto the instance
    ///
    /// Any still-queued activities (primary first, then post-scheduled)
    /// are written back so a suspended instance can pick them up on the
    /// next run.
    pub fn into_instance(mut self) -> WorkflowInstance {
        self.scheduled.append(&mut self.post_scheduled);
        self.instance.scheduled_activities = self.scheduled;
        self.instance
    }
}
