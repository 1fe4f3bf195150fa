//! Serialized workflow definitions
//!
//! A definition is the wire form of a workflow: a directed graph of
//! activities connected by named outcomes, plus the metadata the registry
//! and runner need (versioning, publication flags, context options).
//! Definitions are materialized into executable [`Blueprint`]s before they
//! can run.
//!
//! [`Blueprint`]: crate::blueprint::Blueprint

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named values scoped to a workflow run
///
/// Declared on the definition as initial values, copied onto each new
/// instance, and readable/writable by activities during execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variables(HashMap<String, Value>);

impl Variables {
    /// Create an empty variable set
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Get a variable by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Set a variable, replacing any previous value
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    /// Remove a variable, returning its previous value
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Check whether a variable is present
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over name/value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for Variables {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// When the user workflow-context value is loaded and saved
///
/// `Burst` loads once before the drain loop and saves once after;
/// `Activity` loads and saves around every single dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextFidelity {
    /// Load/save once per burst (the default)
    #[default]
    Burst,

    /// Load/save around each activity dispatch
    Activity,
}

/// Options controlling the user workflow-context object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextOptions {
    /// Type name of the caller-supplied context payload
    #[serde(default)]
    pub context_type: Option<String>,

    /// Load/save policy
    #[serde(default)]
    pub context_fidelity: ContextFidelity,
}

/// When the hosting layer should persist a workflow instance
///
/// Carried as data only; the instance store itself is external.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistenceBehavior {
    /// Persist only when the workflow suspends
    Suspended,

    /// Persist after each burst of execution (the default)
    #[default]
    WorkflowBurst,

    /// Persist after every executed activity
    ActivityExecuted,
}

/// A single activity property: an expression evaluated at dispatch time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDefinition {
    /// The expression source text
    pub expression: String,

    /// Expression syntax, e.g. `Literal`, `JSON`, `Variable`
    #[serde(default = "default_syntax")]
    pub syntax: String,

    /// Declared return type of the expression
    #[serde(rename = "type", default = "default_property_type")]
    pub value_type: String,
}

fn default_syntax() -> String {
    crate::expressions::syntaxes::LITERAL.to_string()
}

fn default_property_type() -> String {
    "String".to_string()
}

impl PropertyDefinition {
    /// Create a property with an explicit syntax
    pub fn new(expression: impl Into<String>, syntax: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            syntax: syntax.into(),
            value_type: default_property_type(),
        }
    }

    /// A literal string property
    pub fn literal(expression: impl Into<String>) -> Self {
        Self::new(expression, crate::expressions::syntaxes::LITERAL)
    }

    /// A JSON-encoded property
    pub fn json(expression: impl Into<String>) -> Self {
        Self::new(expression, crate::expressions::syntaxes::JSON)
    }

    /// A property bound to a workflow variable
    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(name, crate::expressions::syntaxes::VARIABLE)
    }

    /// Set the declared return type
    pub fn with_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = value_type.into();
        self
    }
}

/// A directed edge from a source activity to a target activity,
/// labeled with the outcome that routes along it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDefinition {
    pub source_activity_id: String,
    pub target_activity_id: String,
    pub outcome: String,
}

impl ConnectionDefinition {
    /// Create a connection
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        outcome: impl Into<String>,
    ) -> Self {
        Self {
            source_activity_id: source.into(),
            target_activity_id: target.into(),
            outcome: outcome.into(),
        }
    }
}

/// A node in the workflow graph
///
/// A composite activity carries its own nested activities and connections;
/// the nested graph is a separate scope for id uniqueness and connection
/// resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDefinition {
    /// Unique id within the enclosing scope
    pub activity_id: String,

    /// Activity type name, resolved through the service provider
    #[serde(rename = "type")]
    pub activity_type: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Hint to the hosting layer to persist after this activity
    #[serde(default)]
    pub persist_workflow: bool,

    /// Property expressions, keyed by property name
    #[serde(default)]
    pub properties: HashMap<String, PropertyDefinition>,

    /// Nested activities (composite activities only)
    #[serde(default)]
    pub activities: Vec<ActivityDefinition>,

    /// Nested connections (composite activities only)
    #[serde(default)]
    pub connections: Vec<ConnectionDefinition>,
}

impl ActivityDefinition {
    /// Create a leaf activity
    pub fn new(activity_id: impl Into<String>, activity_type: impl Into<String>) -> Self {
        Self {
            activity_id: activity_id.into(),
            activity_type: activity_type.into(),
            name: None,
            display_name: None,
            description: None,
            persist_workflow: false,
            properties: HashMap::new(),
            activities: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Whether this activity carries a nested graph
    pub fn is_composite(&self) -> bool {
        !self.activities.is_empty()
    }

    /// Add a property expression
    pub fn with_property(mut self, name: impl Into<String>, property: PropertyDefinition) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Add a nested activity, turning this activity into a composite
    pub fn with_child(mut self, child: ActivityDefinition) -> Self {
        self.activities.push(child);
        self
    }

    /// Add a nested connection
    pub fn with_child_connection(mut self, connection: ConnectionDefinition) -> Self {
        self.connections.push(connection);
        self
    }
}

/// The serialized description of a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    /// Definition id, stable across versions
    pub id: String,

    /// Definition version
    pub version: i32,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// At most one non-terminal instance at a time (hosting-layer concern)
    #[serde(default)]
    pub is_singleton: bool,

    #[serde(default = "default_true")]
    pub is_enabled: bool,

    #[serde(default)]
    pub is_latest: bool,

    #[serde(default)]
    pub is_published: bool,

    /// Initial variables for new instances
    #[serde(default)]
    pub variables: Variables,

    /// User workflow-context options; absent means no context handling
    #[serde(default)]
    pub context_options: Option<ContextOptions>,

    #[serde(default)]
    pub persistence_behavior: PersistenceBehavior,

    #[serde(default)]
    pub delete_completed_instances: bool,

    #[serde(default)]
    pub activities: Vec<ActivityDefinition>,

    #[serde(default)]
    pub connections: Vec<ConnectionDefinition>,
}

fn default_true() -> bool {
    true
}

impl WorkflowDefinition {
    /// Create an empty definition
    pub fn new(id: impl Into<String>, version: i32) -> Self {
        Self {
            id: id.into(),
            version,
            name: None,
            description: None,
            is_singleton: false,
            is_enabled: true,
            is_latest: true,
            is_published: true,
            variables: Variables::new(),
            context_options: None,
            persistence_behavior: PersistenceBehavior::default(),
            delete_completed_instances: false,
            activities: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Add an activity
    pub fn with_activity(mut self, activity: ActivityDefinition) -> Self {
        self.activities.push(activity);
        self
    }

    /// Add a connection
    pub fn with_connection(mut self, connection: ConnectionDefinition) -> Self {
        self.connections.push(connection);
        self
    }

    /// Set the context options
    pub fn with_context_options(mut self, options: ContextOptions) -> Self {
        self.context_options = Some(options);
        self
    }

    /// Seed an initial variable
    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.set(name, value);
        self
    }
}
