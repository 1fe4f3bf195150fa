//! Expression evaluation port
//!
//! Activity properties are expressions evaluated at dispatch time against
//! the current [`ActivityExecutionContext`]. The evaluation engine itself
//! is external; the engine only defines the port and a small built-in
//! evaluator for literal, JSON and variable-bound properties.

use async_trait::async_trait;
use serde_json::Value;

use crate::activity::ActivityExecutionContext;

/// Well-known expression syntax names
pub mod syntaxes {
    /// The expression text is the value
    pub const LITERAL: &str = "Literal";

    /// The expression text is a JSON document
    pub const JSON: &str = "JSON";

    /// The expression text names a workflow variable
    pub const VARIABLE: &str = "Variable";
}

/// Errors from expression evaluation
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// No evaluator handles the requested syntax
    #[error("unsupported expression syntax: {0}")]
    UnsupportedSyntax(String),

    /// The expression failed to evaluate
    #[error("invalid expression: {0}")]
    InvalidExpression(String),
}

/// Evaluates property expressions against the current dispatch
#[async_trait]
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluate an expression
    ///
    /// `return_type` is the property's declared type; evaluators may use
    /// it to coerce the result.
    async fn evaluate(
        &self,
        expression: &str,
        syntax: &str,
        return_type: &str,
        ctx: &ActivityExecutionContext,
    ) -> Result<Value, EvaluationError>;
}

/// Built-in evaluator for the three basic syntaxes
///
/// `Literal` passes the expression through as a string, `JSON` parses it,
/// and `Variable` looks the name up in the workflow variables (null when
/// absent).
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralEvaluator;

impl LiteralEvaluator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExpressionEvaluator for LiteralEvaluator {
    async fn evaluate(
        &self,
        expression: &str,
        syntax: &str,
        _return_type: &str,
        ctx: &ActivityExecutionContext,
    ) -> Result<Value, EvaluationError> {
        match syntax {
            syntaxes::LITERAL => Ok(Value::String(expression.to_string())),

            syntaxes::JSON => serde_json::from_str(expression)
                .map_err(|e| EvaluationError::InvalidExpression(e.to_string())),

            syntaxes::VARIABLE => Ok(ctx
                .get_variable(expression)
                .cloned()
                .unwrap_or(Value::Null)),

            other => Err(EvaluationError::UnsupportedSyntax(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::{ActivityRegistry, ServiceProvider};
    use crate::blueprint::materialize;
    use crate::workflow::{ActivityDefinition, Variables, WorkflowDefinition};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    fn test_context(variables: Variables) -> ActivityExecutionContext {
        let definition =
            WorkflowDefinition::new("wf", 1).with_activity(ActivityDefinition::new("a", "noop"));
        let blueprint = materialize(&definition).unwrap();
        let activity = blueprint.activity("a").unwrap();

        ActivityExecutionContext::new(
            Uuid::now_v7(),
            "wf".to_string(),
            None,
            activity,
            None,
            variables,
            None,
            false,
            ActivityRegistry::new().create_scope(),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_literal_syntax() {
        let ctx = test_context(Variables::new());
        let value = LiteralEvaluator::new()
            .evaluate("hello", syntaxes::LITERAL, "String", &ctx)
            .await
            .unwrap();

        assert_eq!(value, serde_json::json!("hello"));
    }

    #[tokio::test]
    async fn test_json_syntax() {
        let ctx = test_context(Variables::new());
        let value = LiteralEvaluator::new()
            .evaluate(r#"{"n": 3}"#, syntaxes::JSON, "Object", &ctx)
            .await
            .unwrap();

        assert_eq!(value, serde_json::json!({"n": 3}));
    }

    #[tokio::test]
    async fn test_json_syntax_rejects_garbage() {
        let ctx = test_context(Variables::new());
        let result = LiteralEvaluator::new()
            .evaluate("{not json", syntaxes::JSON, "Object", &ctx)
            .await;

        assert!(matches!(result, Err(EvaluationError::InvalidExpression(_))));
    }

    #[tokio::test]
    async fn test_variable_syntax() {
        let mut variables = Variables::new();
        variables.set("count", serde_json::json!(7));
        let ctx = test_context(variables);

        let value = LiteralEvaluator::new()
            .evaluate("count", syntaxes::VARIABLE, "Number", &ctx)
            .await
            .unwrap();

        assert_eq!(value, serde_json::json!(7));

        let missing = LiteralEvaluator::new()
            .evaluate("absent", syntaxes::VARIABLE, "Number", &ctx)
            .await
            .unwrap();

        assert_eq!(missing, Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_syntax() {
        let ctx = test_context(Variables::new());
        let result = LiteralEvaluator::new()
            .evaluate("x", "JavaScript", "String", &ctx)
            .await;

        assert!(matches!(result, Err(EvaluationError::UnsupportedSyntax(_))));
    }
}
