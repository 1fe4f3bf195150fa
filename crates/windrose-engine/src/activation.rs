//! Scoped activity activation
//!
//! Activities are instantiated through a [`ServiceProvider`], the engine's
//! seam to a dependency-injection container. A fresh [`ServiceScope`] is
//! acquired per `can_execute` probe and per drain loop; activities created
//! from one scope share its scope-local services for the burst. Scopes are
//! released when dropped, on every exit path.

use std::collections::HashMap;
use std::sync::Arc;

use crate::activity::Activity;

/// Errors from activity activation
#[derive(Debug, thiserror::Error)]
pub enum ActivationError {
    /// No constructor registered for the requested type
    #[error("unknown activity type: {0}")]
    UnknownActivityType(String),

    /// The underlying container failed to produce an instance
    #[error("activation failed for {activity_type}: {message}")]
    Failed {
        activity_type: String,
        message: String,
    },
}

/// A resolution scope over activity implementations
pub trait ServiceScope: Send + Sync {
    /// Produce a fresh activity instance for the given type name
    fn resolve(&self, activity_type: &str) -> Result<Box<dyn Activity>, ActivationError>;
}

/// Produces resolution scopes
///
/// Implementations must be safe for concurrent use by multiple runner
/// invocations.
pub trait ServiceProvider: Send + Sync {
    fn create_scope(&self) -> Arc<dyn ServiceScope>;
}

type Constructor = Arc<dyn Fn() -> Box<dyn Activity> + Send + Sync>;

/// In-memory activity catalog
///
/// Maps activity type names to constructor closures. This stands in for a
/// real container in tests and simple hosts.
///
/// # Example
///
/// ```ignore
/// let mut registry = ActivityRegistry::new();
/// registry.register("log", || Box::new(LogActivity::default()));
/// ```
#[derive(Default)]
pub struct ActivityRegistry {
    constructors: HashMap<String, Constructor>,
}

impl ActivityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register a constructor for an activity type
    pub fn register<F>(&mut self, activity_type: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn Activity> + Send + Sync + 'static,
    {
        self.constructors
            .insert(activity_type.into(), Arc::new(constructor));
    }

    /// Check whether a type is registered
    pub fn contains(&self, activity_type: &str) -> bool {
        self.constructors.contains_key(activity_type)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Check whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl ServiceProvider for ActivityRegistry {
    fn create_scope(&self) -> Arc<dyn ServiceScope> {
        Arc::new(RegistryScope {
            constructors: self.constructors.clone(),
        })
    }
}

struct RegistryScope {
    constructors: HashMap<String, Constructor>,
}

impl ServiceScope for RegistryScope {
    fn resolve(&self, activity_type: &str) -> Result<Box<dyn Activity>, ActivationError> {
        let constructor = self
            .constructors
            .get(activity_type)
            .ok_or_else(|| ActivationError::UnknownActivityType(activity_type.to_string()))?;

        Ok(constructor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityError, ActivityExecutionContext, ActivityResult};
    use async_trait::async_trait;

    struct NoopActivity;

    #[async_trait]
    impl Activity for NoopActivity {
        fn type_name(&self) -> &str {
            "noop"
        }

        async fn execute(
            &mut self,
            _ctx: &mut ActivityExecutionContext,
        ) -> Result<ActivityResult, ActivityError> {
            Ok(ActivityResult::noop())
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ActivityRegistry::new();
        registry.register("noop", || Box::new(NoopActivity));

        assert!(registry.contains("noop"));

        let scope = registry.create_scope();
        let activity = scope.resolve("noop").expect("should resolve");
        assert_eq!(activity.type_name(), "noop");
    }

    #[test]
    fn test_unknown_type() {
        let registry = ActivityRegistry::new();
        let scope = registry.create_scope();

        let result = scope.resolve("missing");
        assert!(matches!(
            result,
            Err(ActivationError::UnknownActivityType(_))
        ));
    }

    #[test]
    fn test_scopes_are_independent() {
        let mut registry = ActivityRegistry::new();
        registry.register("noop", || Box::new(NoopActivity));

        let first = registry.create_scope();
        let second = registry.create_scope();

        assert!(first.resolve("noop").is_ok());
        assert!(second.resolve("noop").is_ok());
    }
}
