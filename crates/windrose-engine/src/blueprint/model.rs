//! Executable blueprint model
//!
//! The blueprint is the immutable, materialized form of a workflow
//! definition: activities indexed by id with their factory closures,
//! connections holding direct references to their endpoints, and the
//! property-provider table the runner evaluates at dispatch time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::activation::{ActivationError, ServiceScope};
use crate::activity::{Activity, ActivityExecutionContext};
use crate::expressions::{EvaluationError, ExpressionEvaluator};
use crate::workflow::{
    ContextFidelity, ContextOptions, PersistenceBehavior, Variables,
};

/// Instantiates an activity through the scoped service provider
pub type ActivityFactory =
    Arc<dyn Fn(&dyn ServiceScope) -> Result<Box<dyn Activity>, ActivationError> + Send + Sync>;

/// The nested graph of a composite activity
///
/// A composite differs from a leaf by carrying this body; there is no
/// separate blueprint type. The body is a distinct scope: its ids are
/// unique within it and its connections resolve only against it.
pub struct CompositeBody {
    pub activities: HashMap<String, Arc<ActivityBlueprint>>,
    pub activity_order: Vec<String>,
    pub connections: Vec<Connection>,
}

/// Executable form of a single activity
pub struct ActivityBlueprint {
    /// Unique id within the enclosing scope
    pub id: String,

    /// Activity type name, resolved through the service provider
    pub activity_type: String,

    /// Hint to the hosting layer to persist after this activity
    pub persist_workflow: bool,

    /// Creates the activity instance for a dispatch
    pub factory: ActivityFactory,

    /// Present for composite activities
    pub body: Option<CompositeBody>,
}

impl ActivityBlueprint {
    /// Whether this activity carries a nested graph
    pub fn is_composite(&self) -> bool {
        self.body.is_some()
    }
}

impl fmt::Debug for ActivityBlueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityBlueprint")
            .field("id", &self.id)
            .field("activity_type", &self.activity_type)
            .field("composite", &self.is_composite())
            .finish()
    }
}

/// A directed edge between two activity blueprints
#[derive(Clone)]
pub struct Connection {
    pub source: Arc<ActivityBlueprint>,
    pub target: Arc<ActivityBlueprint>,
    pub outcome: String,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -[{}]-> {}",
            self.source.id, self.outcome, self.target.id
        )
    }
}

/// A deferred property expression
///
/// Closes over the expression source, syntax and declared type from the
/// definition; invoked per dispatch against the current activity
/// execution context.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyProvider {
    pub name: String,
    pub expression: String,
    pub syntax: String,
    pub value_type: String,
}

impl PropertyProvider {
    /// Evaluate this property for the given dispatch
    pub async fn provide(
        &self,
        evaluator: &dyn ExpressionEvaluator,
        ctx: &ActivityExecutionContext,
    ) -> Result<Value, EvaluationError> {
        evaluator
            .evaluate(&self.expression, &self.syntax, &self.value_type, ctx)
            .await
    }
}

/// The immutable executable form of a workflow
pub struct Blueprint {
    pub definition_id: String,
    pub version: i32,
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_singleton: bool,
    pub is_enabled: bool,
    pub is_latest: bool,
    pub is_published: bool,
    pub variables: Variables,
    pub context_options: Option<ContextOptions>,
    pub persistence_behavior: PersistenceBehavior,
    pub delete_completed_instances: bool,

    /// Top-level connections, in definition order
    pub connections: Vec<Connection>,

    pub(super) activities: HashMap<String, Arc<ActivityBlueprint>>,
    pub(super) activity_order: Vec<String>,
    pub(super) property_providers: HashMap<String, Vec<PropertyProvider>>,
}

impl Blueprint {
    /// Look up an activity by id
    ///
    /// Resolves against the top-level scope first, then depth-first into
    /// composite bodies.
    pub fn activity(&self, activity_id: &str) -> Option<Arc<ActivityBlueprint>> {
        if let Some(found) = self.activities.get(activity_id) {
            return Some(found.clone());
        }

        for id in &self.activity_order {
            if let Some(body) = &self.activities[id].body {
                if let Some(found) = find_in_body(body, activity_id) {
                    return Some(found);
                }
            }
        }

        None
    }

    /// Top-level activities in declaration order
    pub fn activities(&self) -> impl Iterator<Item = &Arc<ActivityBlueprint>> {
        self.activity_order.iter().map(|id| &self.activities[id])
    }

    /// The activity a begin with no explicit target starts from
    ///
    /// The first activity that is never a connection target, falling back
    /// to the first declared activity.
    pub fn start_activity(&self) -> Option<Arc<ActivityBlueprint>> {
        let unreferenced = self.activity_order.iter().find(|id| {
            !self
                .connections
                .iter()
                .any(|connection| connection.target.id == **id)
        });

        unreferenced
            .or_else(|| self.activity_order.first())
            .map(|id| self.activities[id].clone())
    }

    /// Connections leaving the given activity, resolved within the scope
    /// that declares it
    pub fn connections_from(&self, activity_id: &str) -> Vec<Connection> {
        if self.activities.contains_key(activity_id) {
            return self
                .connections
                .iter()
                .filter(|connection| connection.source.id == activity_id)
                .cloned()
                .collect();
        }

        for id in &self.activity_order {
            if let Some(body) = &self.activities[id].body {
                if let Some(found) = body_connections_from(body, activity_id) {
                    return found;
                }
            }
        }

        Vec::new()
    }

    /// Property providers registered for an activity
    pub fn property_providers_for(&self, activity_id: &str) -> &[PropertyProvider] {
        self.property_providers
            .get(activity_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The declared context fidelity, if context options are present
    pub fn context_fidelity(&self) -> Option<ContextFidelity> {
        self.context_options
            .as_ref()
            .map(|options| options.context_fidelity)
    }
}

impl fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("definition_id", &self.definition_id)
            .field("version", &self.version)
            .field("activities", &self.activity_order)
            .field("connections", &self.connections)
            .finish()
    }
}

fn find_in_body(body: &CompositeBody, activity_id: &str) -> Option<Arc<ActivityBlueprint>> {
    if let Some(found) = body.activities.get(activity_id) {
        return Some(found.clone());
    }

    for id in &body.activity_order {
        if let Some(nested) = &body.activities[id].body {
            if let Some(found) = find_in_body(nested, activity_id) {
                return Some(found);
            }
        }
    }

    None
}

fn body_connections_from(body: &CompositeBody, activity_id: &str) -> Option<Vec<Connection>> {
    if body.activities.contains_key(activity_id) {
        return Some(
            body.connections
                .iter()
                .filter(|connection| connection.source.id == activity_id)
                .cloned()
                .collect(),
        );
    }

    for id in &body.activity_order {
        if let Some(nested) = &body.activities[id].body {
            if let Some(found) = body_connections_from(nested, activity_id) {
                return Some(found);
            }
        }
    }

    None
}
