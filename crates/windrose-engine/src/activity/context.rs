//! Activity execution context

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::activation::ServiceScope;
use crate::blueprint::ActivityBlueprint;
use crate::workflow::Variables;

/// Context for a single activity dispatch
///
/// Created immediately before an activity runs and discarded after its
/// result has been applied. The workflow's variables and the loaded user
/// workflow-context value are checked out of the workflow execution
/// context for the duration of the dispatch and synced back afterwards,
/// so activities mutate them through this context.
pub struct ActivityExecutionContext {
    /// Id of the owning workflow instance
    pub workflow_instance_id: Uuid,

    /// Definition id of the owning workflow
    pub definition_id: String,

    /// Correlation key of the owning instance
    pub correlation_id: Option<String>,

    /// The blueprint of the activity being dispatched
    pub activity: Arc<ActivityBlueprint>,

    /// Input handed to this dispatch
    pub input: Option<Value>,

    /// Output slot; picked up by the runner after the dispatch
    pub output: Option<Value>,

    /// Workflow variables, checked out for this dispatch
    pub variables: Variables,

    /// The loaded user workflow-context value, if any
    pub workflow_context: Option<Value>,

    /// Whether this dispatch is a resume rather than an execute
    pub resuming: bool,

    scope: Arc<dyn ServiceScope>,
    cancellation: CancellationToken,
}

impl ActivityExecutionContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        workflow_instance_id: Uuid,
        definition_id: String,
        correlation_id: Option<String>,
        activity: Arc<ActivityBlueprint>,
        input: Option<Value>,
        variables: Variables,
        workflow_context: Option<Value>,
        resuming: bool,
        scope: Arc<dyn ServiceScope>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            workflow_instance_id,
            definition_id,
            correlation_id,
            activity,
            input,
            output: None,
            variables,
            workflow_context,
            resuming,
            scope,
            cancellation,
        }
    }

    /// Id of the activity being dispatched
    pub fn activity_id(&self) -> &str {
        &self.activity.id
    }

    /// Type of the activity being dispatched
    pub fn activity_type(&self) -> &str {
        &self.activity.activity_type
    }

    /// Set the output of this dispatch
    ///
    /// The output becomes the workflow's pending output and is handed as
    /// input to any successors scheduled along this activity's outcomes.
    pub fn set_output(&mut self, value: Value) {
        self.output = Some(value);
    }

    /// Read a workflow variable
    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Write a workflow variable
    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.set(name, value);
    }

    /// The burst's service scope
    pub fn scope(&self) -> &dyn ServiceScope {
        self.scope.as_ref()
    }

    /// Whether cancellation of the run has been requested
    pub fn is_cancellation_requested(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// The run's cancellation token, for `select!` patterns
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}
