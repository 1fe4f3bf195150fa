//! Activity execution results
//!
//! Every dispatch produces an [`ActivityResult`]; applying the result to
//! the workflow execution context is what moves a run forward. Results are
//! tagged variants with an `apply` operation rather than a type hierarchy,
//! and [`ActivityResult::Combined`] composes them.

use serde_json::Value;

use super::context::ActivityExecutionContext;
use super::definition::ActivityError;
use crate::engine::WorkflowExecutionContext;

/// Well-known outcome names
pub mod outcome_names {
    /// The conventional single outcome of an unconditional activity
    pub const DONE: &str = "Done";
}

/// The result of one activity dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityResult {
    /// Complete the activity along the named outcomes
    ///
    /// Applying this enqueues the target of every connection from the
    /// completed activity whose outcome matches one of the names
    /// (case-insensitive), handing each target the activity's output as
    /// input.
    Outcomes(Vec<String>),

    /// Append a specific activity to the primary queue
    ///
    /// Used by composite activities to enter their nested graph.
    Schedule {
        activity_id: String,
        input: Option<Value>,
    },

    /// Append a specific activity to the post-scheduled queue, drained
    /// once the primary queue empties
    PostSchedule {
        activity_id: String,
        input: Option<Value>,
    },

    /// Park the current activity in the blocking set; the workflow
    /// suspends once the burst ends
    Suspend,

    /// Cancel the workflow
    Cancel,

    /// Fault the workflow with the given error
    Fault(ActivityError),

    /// Apply several results in sequence
    Combined(Vec<ActivityResult>),

    /// No effect
    Noop,
}

impl ActivityResult {
    /// Complete along a single outcome
    pub fn outcome(name: impl Into<String>) -> Self {
        Self::Outcomes(vec![name.into()])
    }

    /// Complete along several outcomes at once
    pub fn outcomes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Outcomes(names.into_iter().map(Into::into).collect())
    }

    /// Complete along the conventional `Done` outcome
    pub fn done() -> Self {
        Self::outcome(outcome_names::DONE)
    }

    /// Schedule an activity onto the primary queue
    pub fn schedule(activity_id: impl Into<String>, input: Option<Value>) -> Self {
        Self::Schedule {
            activity_id: activity_id.into(),
            input,
        }
    }

    /// Schedule an activity onto the post-scheduled queue
    pub fn post_schedule(activity_id: impl Into<String>, input: Option<Value>) -> Self {
        Self::PostSchedule {
            activity_id: activity_id.into(),
            input,
        }
    }

    pub fn suspend() -> Self {
        Self::Suspend
    }

    pub fn cancel() -> Self {
        Self::Cancel
    }

    pub fn fault(error: impl Into<ActivityError>) -> Self {
        Self::Fault(error.into())
    }

    pub fn combined(results: impl IntoIterator<Item = ActivityResult>) -> Self {
        Self::Combined(results.into_iter().collect())
    }

    pub fn noop() -> Self {
        Self::Noop
    }

    /// Apply this result to the workflow execution context
    ///
    /// This is the only place activity results mutate run state: queues,
    /// the blocking set, and the workflow status.
    pub fn apply(self, ctx: &mut WorkflowExecutionContext, actx: &ActivityExecutionContext) {
        match self {
            Self::Outcomes(names) => {
                let blueprint = ctx.blueprint().clone();
                for connection in blueprint.connections_from(actx.activity_id()) {
                    let matched = names
                        .iter()
                        .any(|name| name.eq_ignore_ascii_case(&connection.outcome));
                    if matched {
                        ctx.schedule_activity(connection.target.id.clone(), actx.output.clone());
                    }
                }
            }

            Self::Schedule { activity_id, input } => {
                ctx.schedule_activity(activity_id, input);
            }

            Self::PostSchedule { activity_id, input } => {
                ctx.schedule_post_activity(activity_id, input);
            }

            Self::Suspend => {
                ctx.add_blocking(actx.activity_id(), actx.activity_type());
            }

            Self::Cancel => {
                ctx.cancel();
            }

            Self::Fault(error) => {
                ctx.fault(Some(actx.activity_id()), error.to_string());
            }

            Self::Combined(results) => {
                for result in results {
                    result.apply(ctx, actx);
                }
            }

            Self::Noop => {}
        }
    }
}

impl From<ActivityError> for ActivityResult {
    fn from(error: ActivityError) -> Self {
        Self::Fault(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::{ActivityRegistry, ServiceProvider};
    use crate::blueprint::materialize;
    use crate::workflow::{
        ActivityDefinition, ConnectionDefinition, Variables, WorkflowDefinition, WorkflowFactory,
        WorkflowStatus,
    };
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn two_step_context() -> (WorkflowExecutionContext, ActivityExecutionContext) {
        let definition = WorkflowDefinition::new("wf", 1)
            .with_activity(ActivityDefinition::new("a", "noop"))
            .with_activity(ActivityDefinition::new("b", "noop"))
            .with_connection(ConnectionDefinition::new("a", "b", "Done"));

        let blueprint = Arc::new(materialize(&definition).unwrap());
        let instance = WorkflowFactory::new().instantiate(&blueprint, None, None);
        let activity = blueprint.activity("a").unwrap();
        let instance_id = instance.id;
        let ctx = WorkflowExecutionContext::new(blueprint, instance);

        let actx = ActivityExecutionContext::new(
            instance_id,
            "wf".to_string(),
            None,
            activity,
            None,
            Variables::new(),
            None,
            false,
            ActivityRegistry::new().create_scope(),
            CancellationToken::new(),
        );

        (ctx, actx)
    }

    #[test]
    fn test_outcomes_schedule_successors() {
        let (mut ctx, mut actx) = two_step_context();
        actx.set_output(serde_json::json!("payload"));

        ActivityResult::done().apply(&mut ctx, &actx);

        let scheduled = ctx.pop_scheduled_activity().expect("successor scheduled");
        assert_eq!(scheduled.activity_id, "b");
        assert_eq!(scheduled.input, Some(serde_json::json!("payload")));
    }

    #[test]
    fn test_outcomes_match_case_insensitively() {
        let (mut ctx, actx) = two_step_context();

        ActivityResult::outcome("done").apply(&mut ctx, &actx);

        assert!(ctx.has_scheduled_activities());
    }

    #[test]
    fn test_unmatched_outcome_schedules_nothing() {
        let (mut ctx, actx) = two_step_context();

        ActivityResult::outcome("Failed").apply(&mut ctx, &actx);

        assert!(!ctx.has_scheduled_activities());
    }

    #[test]
    fn test_suspend_adds_blocking_entry() {
        let (mut ctx, actx) = two_step_context();

        ActivityResult::suspend().apply(&mut ctx, &actx);

        assert!(ctx.blocking_contains("a"));
        assert!(!ctx.has_scheduled_activities());
    }

    #[test]
    fn test_fault_records_and_sets_status() {
        let (mut ctx, actx) = two_step_context();

        ActivityResult::fault(ActivityError::new("boom")).apply(&mut ctx, &actx);

        assert_eq!(ctx.status(), WorkflowStatus::Faulted);
        let instance = ctx.into_instance();
        assert_eq!(instance.faults.len(), 1);
        assert_eq!(instance.faults[0].activity_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_combined_applies_in_sequence() {
        let (mut ctx, actx) = two_step_context();

        ActivityResult::combined([
            ActivityResult::schedule("b", None),
            ActivityResult::post_schedule("a", None),
        ])
        .apply(&mut ctx, &actx);

        assert!(ctx.has_scheduled_activities());
        assert!(ctx.has_post_scheduled_activities());
    }

    #[test]
    fn test_cancel_sets_status() {
        let (mut ctx, actx) = two_step_context();

        ActivityResult::cancel().apply(&mut ctx, &actx);

        assert_eq!(ctx.status(), WorkflowStatus::Cancelled);
    }
}
