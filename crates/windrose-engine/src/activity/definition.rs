//! Activity trait definition

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::context::ActivityExecutionContext;
use super::result::ActivityResult;

/// Error type for activity failures
///
/// An activity failure is recorded on the instance as a workflow fault;
/// it does not propagate to the runner's caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityError {
    /// Error message
    pub message: String,

    /// Error type/code for programmatic handling
    pub error_type: Option<String>,

    /// Additional error details (for debugging)
    pub details: Option<Value>,
}

impl ActivityError {
    /// Create a new error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            details: None,
        }
    }

    /// Set the error type
    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    /// Add error details
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for ActivityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActivityError {}

impl From<anyhow::Error> for ActivityError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// A unit of executable work in a workflow
///
/// Activities are instantiated per dispatch through the scoped service
/// provider, then populated from their property expressions before any
/// lifecycle method runs.
///
/// Lifecycle:
/// - `can_execute` gates the initial dispatch of a begin or resume; a
///   false return makes the whole run a silent no-op.
/// - `execute` runs when the activity is dispatched from the scheduled
///   queue.
/// - `resume` runs instead of `execute` for the single activity a caller
///   resumed into; it defaults to `execute`.
///
/// # Example
///
/// ```ignore
/// struct SetOutput {
///     value: Option<Value>,
/// }
///
/// #[async_trait]
/// impl Activity for SetOutput {
///     fn type_name(&self) -> &str {
///         "set_output"
///     }
///
///     fn set_property(&mut self, name: &str, value: Value) {
///         if name == "Value" {
///             self.value = Some(value);
///         }
///     }
///
///     async fn execute(
///         &mut self,
///         ctx: &mut ActivityExecutionContext,
///     ) -> Result<ActivityResult, ActivityError> {
///         if let Some(value) = self.value.take() {
///             ctx.set_output(value);
///         }
///         Ok(ActivityResult::done())
///     }
/// }
/// ```
#[async_trait]
pub trait Activity: Send + Sync {
    /// The activity type name this implementation answers to
    fn type_name(&self) -> &str;

    /// Receive an evaluated property value
    ///
    /// Called once per registered property provider, before `can_execute`,
    /// `execute` or `resume`. Unknown properties should be ignored.
    fn set_property(&mut self, name: &str, value: Value) {
        let _ = (name, value);
    }

    /// Whether this activity is willing to run for the given dispatch
    async fn can_execute(&self, ctx: &ActivityExecutionContext) -> bool {
        let _ = ctx;
        true
    }

    /// Execute the activity
    async fn execute(
        &mut self,
        ctx: &mut ActivityExecutionContext,
    ) -> Result<ActivityResult, ActivityError>;

    /// Resume the activity after an external signal
    async fn resume(
        &mut self,
        ctx: &mut ActivityExecutionContext,
    ) -> Result<ActivityResult, ActivityError> {
        self.execute(ctx).await
    }
}
