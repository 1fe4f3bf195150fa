//! Workflow runner
//!
//! The `WorkflowRunner` drives one run of a workflow instance: it builds
//! the transient execution context, dispatches begin/resume/continue based
//! on the instance's status, drains the scheduled queue while applying
//! activity results, and publishes the lifecycle notifications external
//! subscribers depend on.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::activation::{ServiceProvider, ServiceScope};
use crate::activity::{Activity, ActivityError, ActivityExecutionContext, ActivityResult};
use crate::blueprint::{ActivityBlueprint, Blueprint};
use crate::events::{Mediator, Notification};
use crate::expressions::ExpressionEvaluator;
use crate::persistence::WorkflowContextManager;
use crate::workflow::{ContextFidelity, WorkflowFactory, WorkflowInstance, WorkflowStatus};

use super::context::WorkflowExecutionContext;
use super::fidelity::ContextFidelityManager;
use super::registry::WorkflowRegistry;

/// Configuration for the workflow runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum activity dispatches within one burst (for safety)
    ///
    /// A graph that keeps rescheduling past this limit is faulted rather
    /// than allowed to spin forever.
    pub max_dispatches_per_burst: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_dispatches_per_burst: 1000,
        }
    }
}

impl RunnerConfig {
    /// Set the dispatch limit
    pub fn with_max_dispatches_per_burst(mut self, max: usize) -> Self {
        self.max_dispatches_per_burst = max.max(1);
        self
    }
}

/// Options for one run call
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit activity to begin from, or the blocking activity to
    /// resume into
    pub activity_id: Option<String>,

    /// Input handed to the first dispatched activity
    pub input: Option<Value>,

    /// Correlation key for instances created by this call
    pub correlation_id: Option<String>,

    /// Context id for instances created by this call
    pub context_id: Option<String>,

    /// Cancellation token observed before every dispatch
    pub cancellation: CancellationToken,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target a specific activity
    pub fn with_activity_id(mut self, activity_id: impl Into<String>) -> Self {
        self.activity_id = Some(activity_id.into());
        self
    }

    /// Set the input value
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    /// Set the correlation id
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Set the context id
    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    /// Set the cancellation token
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

/// Errors from runner operations
///
/// These are framework-level failures surfaced to the caller; activity
/// failures never appear here, they become faults on the instance.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The registry has no blueprint for the instance's definition+version
    #[error("workflow definition missing: {definition_id} v{version}")]
    WorkflowDefinitionMissing {
        definition_id: String,
        version: i32,
    },

    /// An explicitly named activity does not exist in the blueprint
    #[error("activity not found in workflow: {0}")]
    ActivityNotFound(String),

    /// Resume was called without a target activity id
    #[error("resume requires a target activity id")]
    ResumeTargetRequired,

    /// The resume target is not in the instance's blocking set
    #[error("resume target is not a blocking activity: {0}")]
    InvalidResumeTarget(String),

    /// The initial activity could not be instantiated or populated
    #[error("failed to prepare activity {activity_id}: {source}")]
    Preparation {
        activity_id: String,
        #[source]
        source: ActivityError,
    },
}

/// Which entry point a dispatch goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Execute,
    Resume,
}

/// Drives workflow instances through bursts of execution
///
/// One runner serves many concurrent runs; each run owns its transient
/// execution context exclusively, so the runner itself holds only shared,
/// thread-safe collaborators.
pub struct WorkflowRunner {
    registry: Arc<WorkflowRegistry>,
    factory: WorkflowFactory,
    services: Arc<dyn ServiceProvider>,
    evaluator: Arc<dyn ExpressionEvaluator>,
    fidelity: ContextFidelityManager,
    mediator: Arc<Mediator>,
    config: RunnerConfig,
}

impl WorkflowRunner {
    pub fn new(
        registry: Arc<WorkflowRegistry>,
        services: Arc<dyn ServiceProvider>,
        evaluator: Arc<dyn ExpressionEvaluator>,
        context_manager: Arc<dyn WorkflowContextManager>,
        mediator: Arc<Mediator>,
    ) -> Self {
        Self {
            registry,
            factory: WorkflowFactory::new(),
            services,
            evaluator,
            fidelity: ContextFidelityManager::new(context_manager),
            mediator,
            config: RunnerConfig::default(),
        }
    }

    /// Replace the runner configuration
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run a fresh instance of a blueprint
    #[instrument(skip_all, fields(definition_id = %blueprint.definition_id))]
    pub async fn run(
        &self,
        blueprint: Arc<Blueprint>,
        options: RunOptions,
    ) -> Result<WorkflowInstance, RunnerError> {
        let instance = self.factory.instantiate(
            &blueprint,
            options.correlation_id.clone(),
            options.context_id.clone(),
        );

        info!(workflow_instance_id = %instance.id, "created workflow instance");
        self.run_instance(blueprint, instance, options).await
    }

    /// Run an instance, resolving its blueprint through the registry
    #[instrument(skip_all, fields(workflow_instance_id = %instance.id))]
    pub async fn resolve_and_run(
        &self,
        instance: WorkflowInstance,
        options: RunOptions,
    ) -> Result<WorkflowInstance, RunnerError> {
        let blueprint = self
            .registry
            .get_by_instance(&instance.definition_id, instance.version)
            .await
            .ok_or_else(|| RunnerError::WorkflowDefinitionMissing {
                definition_id: instance.definition_id.clone(),
                version: instance.version,
            })?;

        self.run_instance(blueprint, instance, options).await
    }

    /// Run an existing instance against its blueprint
    ///
    /// Dispatches on the instance's status: Idle begins, Running continues
    /// draining, Suspended resumes into the targeted blocking activity. A
    /// terminal instance is a no-op that still publishes
    /// `WorkflowExecuted`.
    #[instrument(
        skip_all,
        fields(
            workflow_instance_id = %instance.id,
            definition_id = %instance.definition_id,
            status = %instance.status,
        )
    )]
    pub async fn run_instance(
        &self,
        blueprint: Arc<Blueprint>,
        instance: WorkflowInstance,
        options: RunOptions,
    ) -> Result<WorkflowInstance, RunnerError> {
        let initial_status = instance.status;
        let mut ctx = WorkflowExecutionContext::new(blueprint.clone(), instance);

        let loaded = self
            .fidelity
            .load(ContextFidelity::Burst, &blueprint, ctx.instance())
            .await;
        ctx.set_workflow_context(loaded);

        let ran = match initial_status {
            WorkflowStatus::Idle => self.begin(&mut ctx, &options).await?,
            WorkflowStatus::Running => {
                self.drain(&mut ctx, Operation::Execute, &options).await;
                true
            }
            WorkflowStatus::Suspended => self.resume(&mut ctx, &options).await?,
            _ => {
                debug!("instance already terminal; nothing to run");
                false
            }
        };

        let value = ctx.workflow_context().cloned();
        self.fidelity
            .save(
                ContextFidelity::Burst,
                &blueprint,
                ctx.instance_mut(),
                value.as_ref(),
            )
            .await;

        let instance = ctx.into_instance();

        self.mediator
            .publish(Notification::WorkflowExecuted {
                workflow_instance_id: instance.id,
                definition_id: instance.definition_id.clone(),
                status: instance.status,
            })
            .await;

        if ran {
            if let Some(notification) = terminal_notification(&instance) {
                self.mediator.publish(notification).await;
            }
        }

        info!(status = %instance.status, "workflow run finished");
        Ok(instance)
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Begin an Idle instance
    ///
    /// Returns false when the start activity declined execution; the run
    /// is then a silent no-op and the status stays Idle.
    async fn begin(
        &self,
        ctx: &mut WorkflowExecutionContext,
        options: &RunOptions,
    ) -> Result<bool, RunnerError> {
        let blueprint = ctx.blueprint().clone();

        let start = match &options.activity_id {
            Some(activity_id) => blueprint
                .activity(activity_id)
                .ok_or_else(|| RunnerError::ActivityNotFound(activity_id.clone()))?,
            None => match blueprint.start_activity() {
                Some(start) => start,
                None => {
                    debug!("workflow has no activities; completing immediately");
                    ctx.begin();
                    ctx.complete();
                    return Ok(true);
                }
            },
        };

        if !self.probe_can_execute(ctx, &start, options).await? {
            debug!(activity_id = %start.id, "start activity declined execution");
            return Ok(false);
        }

        ctx.begin();
        ctx.schedule_activity(start.id.clone(), options.input.clone());
        self.drain(ctx, Operation::Execute, options).await;
        Ok(true)
    }

    /// Resume a Suspended instance into a blocking activity
    async fn resume(
        &self,
        ctx: &mut WorkflowExecutionContext,
        options: &RunOptions,
    ) -> Result<bool, RunnerError> {
        let target_id = options
            .activity_id
            .clone()
            .ok_or(RunnerError::ResumeTargetRequired)?;

        if !ctx.blocking_contains(&target_id) {
            return Err(RunnerError::InvalidResumeTarget(target_id));
        }

        let target = ctx
            .blueprint()
            .activity(&target_id)
            .ok_or_else(|| RunnerError::ActivityNotFound(target_id.clone()))?;

        if !self.probe_can_execute(ctx, &target, options).await? {
            debug!(activity_id = %target_id, "resume target declined execution");
            return Ok(false);
        }

        ctx.remove_blocking(&target_id);
        ctx.resume();
        ctx.schedule_activity(target_id, options.input.clone());
        self.drain(ctx, Operation::Resume, options).await;
        Ok(true)
    }

    // =========================================================================
    // The drain loop
    // =========================================================================

    /// Drain the scheduled queue, applying each activity's result
    ///
    /// Only the first dispatch uses the Resume operation; everything
    /// scheduled during the burst is a fresh execution. Once the primary
    /// queue empties, post-scheduled activities are promoted and the
    /// burst continues unless the workflow has left the Running state.
    async fn drain(
        &self,
        ctx: &mut WorkflowExecutionContext,
        mut operation: Operation,
        options: &RunOptions,
    ) {
        let blueprint = ctx.blueprint().clone();
        let scope = self.services.create_scope();

        while ctx.has_scheduled_activities() {
            if options.cancellation.is_cancelled() {
                info!("cancellation requested; stopping burst");
                ctx.cancel();
                break;
            }

            if ctx.passes() >= self.config.max_dispatches_per_burst {
                error!(
                    passes = ctx.passes(),
                    "dispatch limit exceeded; faulting workflow"
                );
                ctx.fault(None, "dispatch limit exceeded");
                break;
            }

            if blueprint.context_fidelity() == Some(ContextFidelity::Activity) {
                let value = self
                    .fidelity
                    .load(ContextFidelity::Activity, &blueprint, ctx.instance())
                    .await;
                ctx.set_workflow_context(value);
            }

            let Some(scheduled) = ctx.pop_scheduled_activity() else {
                break;
            };

            let Some(activity_blueprint) = blueprint.activity(&scheduled.activity_id) else {
                error!(
                    activity_id = %scheduled.activity_id,
                    "scheduled activity not present in blueprint"
                );
                ctx.fault(
                    Some(&scheduled.activity_id),
                    format!("scheduled activity not found: {}", scheduled.activity_id),
                );
                break;
            };

            ctx.set_current_activity(activity_blueprint.id.clone());

            let resuming = operation == Operation::Resume;
            let mut actx = self.dispatch_context(
                ctx,
                activity_blueprint.clone(),
                scheduled.input,
                resuming,
                scope.clone(),
                options,
            );

            let result = match self.instantiate_activity(&blueprint, &actx).await {
                Ok(mut activity) => {
                    let outcome = match operation {
                        Operation::Execute => activity.execute(&mut actx).await,
                        Operation::Resume => activity.resume(&mut actx).await,
                    };
                    match outcome {
                        Ok(result) => result,
                        Err(error) => {
                            warn!(
                                activity_id = %activity_blueprint.id,
                                %error,
                                "activity execution failed"
                            );
                            ActivityResult::Fault(error)
                        }
                    }
                }
                Err(error) => {
                    warn!(
                        activity_id = %activity_blueprint.id,
                        %error,
                        "activity could not be prepared"
                    );
                    ActivityResult::Fault(error)
                }
            };

            self.mediator
                .publish(Notification::ActivityExecuting {
                    workflow_instance_id: ctx.instance().id,
                    definition_id: ctx.instance().definition_id.clone(),
                    activity_id: activity_blueprint.id.clone(),
                    activity_type: activity_blueprint.activity_type.clone(),
                    resuming,
                })
                .await;

            result.apply(ctx, &actx);
            self.finish_dispatch(ctx, actx);

            self.mediator
                .publish(Notification::ActivityExecuted {
                    workflow_instance_id: ctx.instance().id,
                    definition_id: ctx.instance().definition_id.clone(),
                    activity_id: activity_blueprint.id.clone(),
                    activity_type: activity_blueprint.activity_type.clone(),
                })
                .await;

            if blueprint.context_fidelity() == Some(ContextFidelity::Activity) {
                let value = ctx.workflow_context().cloned();
                self.fidelity
                    .save(
                        ContextFidelity::Activity,
                        &blueprint,
                        ctx.instance_mut(),
                        value.as_ref(),
                    )
                    .await;
            }

            // Resume semantics apply only to the activity the caller named.
            operation = Operation::Execute;
            ctx.complete_pass();

            if matches!(
                ctx.status(),
                WorkflowStatus::Faulted | WorkflowStatus::Cancelled
            ) {
                break;
            }

            if !ctx.has_scheduled_activities() && ctx.has_post_scheduled_activities() {
                ctx.schedule_post_activities();
                if ctx.status() != WorkflowStatus::Running {
                    break;
                }
            }
        }

        if ctx.status() == WorkflowStatus::Running {
            if ctx.has_blocking_activities() {
                ctx.suspend();
            } else {
                ctx.complete();
            }
        }
    }

    // =========================================================================
    // Dispatch plumbing
    // =========================================================================

    /// Instantiate an activity and populate it from its property providers
    async fn instantiate_activity(
        &self,
        blueprint: &Blueprint,
        actx: &ActivityExecutionContext,
    ) -> Result<Box<dyn Activity>, ActivityError> {
        let mut activity = (actx.activity.factory)(actx.scope())
            .map_err(|error| ActivityError::new(error.to_string()).with_type("activation"))?;

        for provider in blueprint.property_providers_for(actx.activity_id()) {
            let value = provider
                .provide(self.evaluator.as_ref(), actx)
                .await
                .map_err(|error| {
                    ActivityError::new(format!(
                        "property '{}' evaluation failed: {error}",
                        provider.name
                    ))
                    .with_type("expression")
                })?;

            activity.set_property(&provider.name, value);
        }

        Ok(activity)
    }

    /// Check the initial activity's `can_execute` in its own fresh scope
    async fn probe_can_execute(
        &self,
        ctx: &WorkflowExecutionContext,
        activity_blueprint: &Arc<ActivityBlueprint>,
        options: &RunOptions,
    ) -> Result<bool, RunnerError> {
        let scope = self.services.create_scope();

        let actx = ActivityExecutionContext::new(
            ctx.instance().id,
            ctx.instance().definition_id.clone(),
            ctx.instance().correlation_id.clone(),
            activity_blueprint.clone(),
            options.input.clone(),
            ctx.instance().variables.clone(),
            ctx.workflow_context().cloned(),
            false,
            scope,
            options.cancellation.clone(),
        );

        let activity = self
            .instantiate_activity(ctx.blueprint(), &actx)
            .await
            .map_err(|source| RunnerError::Preparation {
                activity_id: activity_blueprint.id.clone(),
                source,
            })?;

        Ok(activity.can_execute(&actx).await)
    }

    /// Build the per-dispatch context, checking out the run's variables
    /// and workflow-context value
    fn dispatch_context(
        &self,
        ctx: &mut WorkflowExecutionContext,
        activity_blueprint: Arc<ActivityBlueprint>,
        input: Option<Value>,
        resuming: bool,
        scope: Arc<dyn ServiceScope>,
        options: &RunOptions,
    ) -> ActivityExecutionContext {
        ActivityExecutionContext::new(
            ctx.instance().id,
            ctx.instance().definition_id.clone(),
            ctx.instance().correlation_id.clone(),
            activity_blueprint,
            input,
            ctx.take_variables(),
            ctx.take_workflow_context(),
            resuming,
            scope,
            options.cancellation.clone(),
        )
    }

    /// Sync dispatch state back into the run and log the execution
    fn finish_dispatch(
        &self,
        ctx: &mut WorkflowExecutionContext,
        actx: ActivityExecutionContext,
    ) {
        let activity_id = actx.activity.id.clone();
        let activity_type = actx.activity.activity_type.clone();

        ctx.put_variables(actx.variables);
        ctx.set_workflow_context(actx.workflow_context);
        if let Some(output) = actx.output {
            ctx.set_output(output);
        }

        ctx.append_log(activity_id, activity_type);
    }
}

/// The terminal notification for a finished run, if its status has one
fn terminal_notification(instance: &WorkflowInstance) -> Option<Notification> {
    let workflow_instance_id = instance.id;
    let definition_id = instance.definition_id.clone();

    match instance.status {
        WorkflowStatus::Finished => Some(Notification::WorkflowCompleted {
            workflow_instance_id,
            definition_id,
        }),
        WorkflowStatus::Cancelled => Some(Notification::WorkflowCancelled {
            workflow_instance_id,
            definition_id,
        }),
        WorkflowStatus::Faulted => Some(Notification::WorkflowFaulted {
            workflow_instance_id,
            definition_id,
        }),
        WorkflowStatus::Suspended => Some(Notification::WorkflowSuspended {
            workflow_instance_id,
            definition_id,
        }),
        WorkflowStatus::Idle | WorkflowStatus::Running => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivityRegistry;
    use crate::activity::outcome_names;
    use crate::blueprint::materialize;
    use crate::events::RecordingHandler;
    use crate::expressions::LiteralEvaluator;
    use crate::persistence::{InMemoryWorkflowInstanceStore, NullWorkflowContextManager};
    use crate::workflow::{ActivityDefinition, ConnectionDefinition, WorkflowDefinition};
    use async_trait::async_trait;
    use serde_json::json;

    /// Emits `Done`, copying its input (or a `Value` property) to output
    #[derive(Default)]
    struct EchoActivity {
        value: Option<Value>,
    }

    #[async_trait]
    impl Activity for EchoActivity {
        fn type_name(&self) -> &str {
            "echo"
        }

        fn set_property(&mut self, name: &str, value: Value) {
            if name == "Value" {
                self.value = Some(value);
            }
        }

        async fn execute(
            &mut self,
            ctx: &mut ActivityExecutionContext,
        ) -> Result<ActivityResult, ActivityError> {
            let output = self.value.take().or_else(|| ctx.input.clone());
            if let Some(output) = output {
                ctx.set_output(output);
            }
            Ok(ActivityResult::done())
        }
    }

    /// Records the dispatch mode in a variable, then emits `Done`
    struct ModeProbeActivity;

    #[async_trait]
    impl Activity for ModeProbeActivity {
        fn type_name(&self) -> &str {
            "mode_probe"
        }

        async fn execute(
            &mut self,
            ctx: &mut ActivityExecutionContext,
        ) -> Result<ActivityResult, ActivityError> {
            let key = format!("mode:{}", ctx.activity_id());
            ctx.set_variable(key, json!("execute"));
            Ok(ActivityResult::done())
        }

        async fn resume(
            &mut self,
            ctx: &mut ActivityExecutionContext,
        ) -> Result<ActivityResult, ActivityError> {
            let key = format!("mode:{}", ctx.activity_id());
            ctx.set_variable(key, json!("resume"));
            Ok(ActivityResult::done())
        }
    }

    /// Suspends on execute, completes on resume
    struct WaitActivity;

    #[async_trait]
    impl Activity for WaitActivity {
        fn type_name(&self) -> &str {
            "wait"
        }

        async fn execute(
            &mut self,
            _ctx: &mut ActivityExecutionContext,
        ) -> Result<ActivityResult, ActivityError> {
            Ok(ActivityResult::suspend())
        }

        async fn resume(
            &mut self,
            _ctx: &mut ActivityExecutionContext,
        ) -> Result<ActivityResult, ActivityError> {
            Ok(ActivityResult::done())
        }
    }

    fn registry() -> ActivityRegistry {
        let mut registry = ActivityRegistry::new();
        registry.register("echo", || Box::<EchoActivity>::default());
        registry.register("mode_probe", || Box::new(ModeProbeActivity));
        registry.register("wait", || Box::new(WaitActivity));
        registry
    }

    fn runner(services: ActivityRegistry) -> (WorkflowRunner, Arc<RecordingHandler>) {
        let recording = Arc::new(RecordingHandler::new());
        let mediator = Arc::new(Mediator::new().with_handler(recording.clone()));
        let store = Arc::new(InMemoryWorkflowInstanceStore::new());
        let workflow_registry = Arc::new(WorkflowRegistry::new(store, mediator.clone()));

        let runner = WorkflowRunner::new(
            workflow_registry,
            Arc::new(services),
            Arc::new(LiteralEvaluator::new()),
            Arc::new(NullWorkflowContextManager::new()),
            mediator,
        );

        (runner, recording)
    }

    #[tokio::test]
    async fn test_input_flows_to_successors_via_output() {
        let definition = WorkflowDefinition::new("flow", 1)
            .with_activity(ActivityDefinition::new("a", "echo"))
            .with_activity(ActivityDefinition::new("b", "echo"))
            .with_connection(ConnectionDefinition::new("a", "b", outcome_names::DONE));
        let blueprint = Arc::new(materialize(&definition).unwrap());

        let (runner, _) = runner(registry());
        let instance = runner
            .run(blueprint, RunOptions::new().with_input(json!("payload")))
            .await
            .expect("should run");

        assert_eq!(instance.status, WorkflowStatus::Finished);
        // a echoes its input; b receives it as input and echoes it again.
        assert_eq!(instance.output, Some(json!("payload")));
        assert_eq!(instance.execution_log.len(), 2);
    }

    #[tokio::test]
    async fn test_resume_operation_applies_only_to_first_dispatch() {
        let definition = WorkflowDefinition::new("modes", 1)
            .with_activity(ActivityDefinition::new("gate", "wait"))
            .with_activity(ActivityDefinition::new("next", "mode_probe"))
            .with_connection(ConnectionDefinition::new("gate", "next", outcome_names::DONE));
        let blueprint = Arc::new(materialize(&definition).unwrap());

        let (runner, _) = runner(registry());
        let suspended = runner
            .run(blueprint.clone(), RunOptions::new())
            .await
            .unwrap();
        assert_eq!(suspended.status, WorkflowStatus::Suspended);

        let finished = runner
            .run_instance(
                blueprint,
                suspended,
                RunOptions::new().with_activity_id("gate"),
            )
            .await
            .unwrap();

        assert_eq!(finished.status, WorkflowStatus::Finished);
        // The successor scheduled during the resume burst executed fresh.
        assert_eq!(finished.variables.get("mode:next"), Some(&json!("execute")));
    }

    #[tokio::test]
    async fn test_property_provider_populates_activity() {
        let definition = WorkflowDefinition::new("props", 1).with_activity(
            ActivityDefinition::new("a", "echo").with_property(
                "Value",
                crate::workflow::PropertyDefinition::literal("from-property"),
            ),
        );
        let blueprint = Arc::new(materialize(&definition).unwrap());

        let (runner, _) = runner(registry());
        let instance = runner.run(blueprint, RunOptions::new()).await.unwrap();

        assert_eq!(instance.output, Some(json!("from-property")));
    }

    #[tokio::test]
    async fn test_unknown_activity_type_faults_the_workflow() {
        let definition = WorkflowDefinition::new("unknown", 1)
            .with_activity(ActivityDefinition::new("a", "echo"))
            .with_activity(ActivityDefinition::new("b", "no_such_type"))
            .with_connection(ConnectionDefinition::new("a", "b", outcome_names::DONE));
        let blueprint = Arc::new(materialize(&definition).unwrap());

        let (runner, _) = runner(registry());
        let instance = runner.run(blueprint, RunOptions::new()).await.unwrap();

        assert_eq!(instance.status, WorkflowStatus::Faulted);
        assert_eq!(instance.faults.len(), 1);
        assert_eq!(instance.faults[0].activity_id.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_dispatch_limit_faults_cyclic_workflow() {
        let definition = WorkflowDefinition::new("cycle", 1)
            .with_activity(ActivityDefinition::new("a", "echo"))
            .with_activity(ActivityDefinition::new("b", "echo"))
            .with_connection(ConnectionDefinition::new("a", "b", outcome_names::DONE))
            .with_connection(ConnectionDefinition::new("b", "a", outcome_names::DONE));
        let blueprint = Arc::new(materialize(&definition).unwrap());

        let (runner, _) = runner(registry());
        let runner = runner.with_config(RunnerConfig::default().with_max_dispatches_per_burst(10));

        let instance = runner.run(blueprint, RunOptions::new()).await.unwrap();

        assert_eq!(instance.status, WorkflowStatus::Faulted);
        assert_eq!(instance.execution_log.len(), 10);
        assert_eq!(instance.faults[0].message, "dispatch limit exceeded");
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_cancels_before_dispatch() {
        let definition = WorkflowDefinition::new("cancel", 1)
            .with_activity(ActivityDefinition::new("a", "echo"));
        let blueprint = Arc::new(materialize(&definition).unwrap());

        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let (runner, recording) = runner(registry());
        let instance = runner
            .run(
                blueprint,
                RunOptions::new().with_cancellation(cancellation),
            )
            .await
            .unwrap();

        assert_eq!(instance.status, WorkflowStatus::Cancelled);
        assert!(instance.execution_log.is_empty());
        assert_eq!(
            recording.kinds(),
            vec!["workflow_executed", "workflow_cancelled"]
        );
    }

    #[tokio::test]
    async fn test_resume_without_target_is_an_error() {
        let definition = WorkflowDefinition::new("resume", 1)
            .with_activity(ActivityDefinition::new("gate", "wait"));
        let blueprint = Arc::new(materialize(&definition).unwrap());

        let (runner, _) = runner(registry());
        let suspended = runner
            .run(blueprint.clone(), RunOptions::new())
            .await
            .unwrap();

        let result = runner
            .run_instance(blueprint, suspended, RunOptions::new())
            .await;

        assert!(matches!(result, Err(RunnerError::ResumeTargetRequired)));
    }

    #[tokio::test]
    async fn test_resume_target_must_be_blocking() {
        let definition = WorkflowDefinition::new("resume", 1)
            .with_activity(ActivityDefinition::new("gate", "wait"))
            .with_activity(ActivityDefinition::new("other", "echo"));
        let blueprint = Arc::new(materialize(&definition).unwrap());

        let (runner, _) = runner(registry());
        let suspended = runner
            .run(blueprint.clone(), RunOptions::new())
            .await
            .unwrap();

        let result = runner
            .run_instance(
                blueprint,
                suspended,
                RunOptions::new().with_activity_id("other"),
            )
            .await;

        assert!(matches!(
            result,
            Err(RunnerError::InvalidResumeTarget(id)) if id == "other"
        ));
    }

    #[tokio::test]
    async fn test_empty_workflow_completes_immediately() {
        let definition = WorkflowDefinition::new("empty", 1);
        let blueprint = Arc::new(materialize(&definition).unwrap());

        let (runner, recording) = runner(registry());
        let instance = runner.run(blueprint, RunOptions::new()).await.unwrap();

        assert_eq!(instance.status, WorkflowStatus::Finished);
        assert_eq!(
            recording.kinds(),
            vec!["workflow_executed", "workflow_completed"]
        );
    }

    #[tokio::test]
    async fn test_explicit_start_activity() {
        let definition = WorkflowDefinition::new("explicit", 1)
            .with_activity(ActivityDefinition::new("a", "echo"))
            .with_activity(ActivityDefinition::new("b", "echo"));
        let blueprint = Arc::new(materialize(&definition).unwrap());

        let (runner, _) = runner(registry());
        let instance = runner
            .run(blueprint, RunOptions::new().with_activity_id("b"))
            .await
            .unwrap();

        assert_eq!(instance.execution_log.len(), 1);
        assert_eq!(instance.execution_log[0].activity_id, "b");
    }

    #[tokio::test]
    async fn test_unknown_explicit_start_activity_is_an_error() {
        let definition = WorkflowDefinition::new("explicit", 1)
            .with_activity(ActivityDefinition::new("a", "echo"));
        let blueprint = Arc::new(materialize(&definition).unwrap());

        let (runner, _) = runner(registry());
        let result = runner
            .run(blueprint, RunOptions::new().with_activity_id("ghost"))
            .await;

        assert!(matches!(
            result,
            Err(RunnerError::ActivityNotFound(id)) if id == "ghost"
        ));
    }
}
