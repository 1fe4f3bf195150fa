//! Blueprint materializer
//!
//! Converts a serialized [`WorkflowDefinition`] into an executable
//! [`Blueprint`]: activities are built first into a by-id index, then
//! connections are re-wired to hold direct references to their endpoint
//! blueprints. Composite activities recurse; a nested scope's activities
//! are not visible to outer-scope connection resolution.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::activation::ServiceScope;
use crate::workflow::{ActivityDefinition, ConnectionDefinition, WorkflowDefinition};

use super::model::{
    ActivityBlueprint, ActivityFactory, Blueprint, CompositeBody, Connection, PropertyProvider,
};

/// Errors from blueprint materialization
///
/// Both variants are fatal: the definition is malformed.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    /// Two activities share an id within one scope
    #[error("duplicate activity id in scope: {0}")]
    DuplicateActivityId(String),

    /// A connection names an activity that does not exist in its scope
    #[error("connection {source_id} -[{outcome}]-> {target} references an unknown activity")]
    UnresolvedConnection {
        source_id: String,
        target: String,
        outcome: String,
    },
}

/// Materialize a definition into an executable blueprint
///
/// Total on well-formed input and deterministic: materializing the same
/// definition twice yields structurally equal blueprints.
pub fn materialize(definition: &WorkflowDefinition) -> Result<Blueprint, MaterializeError> {
    let mut property_providers = HashMap::new();
    let scope = materialize_scope(
        &definition.activities,
        &definition.connections,
        &mut property_providers,
    )?;

    debug!(
        definition_id = %definition.id,
        version = definition.version,
        activities = scope.order.len(),
        connections = scope.connections.len(),
        "materialized workflow definition"
    );

    Ok(Blueprint {
        definition_id: definition.id.clone(),
        version: definition.version,
        name: definition.name.clone(),
        description: definition.description.clone(),
        is_singleton: definition.is_singleton,
        is_enabled: definition.is_enabled,
        is_latest: definition.is_latest,
        is_published: definition.is_published,
        variables: definition.variables.clone(),
        context_options: definition.context_options.clone(),
        persistence_behavior: definition.persistence_behavior,
        delete_completed_instances: definition.delete_completed_instances,
        connections: scope.connections,
        activities: scope.activities,
        activity_order: scope.order,
        property_providers,
    })
}

struct MaterializedScope {
    activities: HashMap<String, Arc<ActivityBlueprint>>,
    order: Vec<String>,
    connections: Vec<Connection>,
}

fn materialize_scope(
    definitions: &[ActivityDefinition],
    connections: &[ConnectionDefinition],
    property_providers: &mut HashMap<String, Vec<PropertyProvider>>,
) -> Result<MaterializedScope, MaterializeError> {
    let mut activities: HashMap<String, Arc<ActivityBlueprint>> = HashMap::new();
    let mut order = Vec::with_capacity(definitions.len());

    for definition in definitions {
        if activities.contains_key(&definition.activity_id) {
            return Err(MaterializeError::DuplicateActivityId(
                definition.activity_id.clone(),
            ));
        }

        let body = if definition.is_composite() {
            let nested = materialize_scope(
                &definition.activities,
                &definition.connections,
                property_providers,
            )?;
            Some(CompositeBody {
                activities: nested.activities,
                activity_order: nested.order,
                connections: nested.connections,
            })
        } else {
            None
        };

        let blueprint = Arc::new(ActivityBlueprint {
            id: definition.activity_id.clone(),
            activity_type: definition.activity_type.clone(),
            persist_workflow: definition.persist_workflow,
            factory: make_factory(&definition.activity_type),
            body,
        });

        // Sorted by property name so materialization is deterministic.
        let mut providers: Vec<PropertyProvider> = definition
            .properties
            .iter()
            .map(|(name, property)| PropertyProvider {
                name: name.clone(),
                expression: property.expression.clone(),
                syntax: property.syntax.clone(),
                value_type: property.value_type.clone(),
            })
            .collect();
        providers.sort_by(|a, b| a.name.cmp(&b.name));
        if !providers.is_empty() {
            property_providers.insert(definition.activity_id.clone(), providers);
        }

        order.push(definition.activity_id.clone());
        activities.insert(definition.activity_id.clone(), blueprint);
    }

    let mut resolved = Vec::with_capacity(connections.len());
    for connection in connections {
        let source = activities
            .get(&connection.source_activity_id)
            .ok_or_else(|| unresolved(connection))?;
        let target = activities
            .get(&connection.target_activity_id)
            .ok_or_else(|| unresolved(connection))?;

        resolved.push(Connection {
            source: source.clone(),
            target: target.clone(),
            outcome: connection.outcome.clone(),
        });
    }

    Ok(MaterializedScope {
        activities,
        order,
        connections: resolved,
    })
}

fn make_factory(activity_type: &str) -> ActivityFactory {
    let activity_type = activity_type.to_string();
    Arc::new(move |scope: &dyn ServiceScope| scope.resolve(&activity_type))
}

fn unresolved(connection: &ConnectionDefinition) -> MaterializeError {
    MaterializeError::UnresolvedConnection {
        source_id: connection.source_activity_id.clone(),
        target: connection.target_activity_id.clone(),
        outcome: connection.outcome.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::PropertyDefinition;

    fn linear_definition() -> WorkflowDefinition {
        WorkflowDefinition::new("linear", 1)
            .with_activity(
                ActivityDefinition::new("a", "log")
                    .with_property("Message", PropertyDefinition::literal("hello")),
            )
            .with_activity(ActivityDefinition::new("b", "log"))
            .with_connection(ConnectionDefinition::new("a", "b", "Done"))
    }

    #[test]
    fn test_materialize_linear() {
        let blueprint = materialize(&linear_definition()).unwrap();

        assert_eq!(blueprint.definition_id, "linear");
        assert!(blueprint.activity("a").is_some());
        assert!(blueprint.activity("b").is_some());
        assert!(blueprint.activity("c").is_none());

        assert_eq!(blueprint.connections.len(), 1);
        assert_eq!(blueprint.connections[0].source.id, "a");
        assert_eq!(blueprint.connections[0].target.id, "b");
        assert_eq!(blueprint.connections[0].outcome, "Done");

        let providers = blueprint.property_providers_for("a");
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name, "Message");
        assert_eq!(providers[0].expression, "hello");
    }

    #[test]
    fn test_start_activity_is_never_a_target() {
        let blueprint = materialize(&linear_definition()).unwrap();
        assert_eq!(blueprint.start_activity().unwrap().id, "a");
    }

    #[test]
    fn test_start_activity_falls_back_to_first_declared() {
        // A cycle: every activity is a target, so the first declared wins.
        let definition = WorkflowDefinition::new("cycle", 1)
            .with_activity(ActivityDefinition::new("a", "log"))
            .with_activity(ActivityDefinition::new("b", "log"))
            .with_connection(ConnectionDefinition::new("a", "b", "Done"))
            .with_connection(ConnectionDefinition::new("b", "a", "Done"));

        let blueprint = materialize(&definition).unwrap();
        assert_eq!(blueprint.start_activity().unwrap().id, "a");
    }

    #[test]
    fn test_duplicate_activity_id() {
        let definition = WorkflowDefinition::new("dup", 1)
            .with_activity(ActivityDefinition::new("a", "log"))
            .with_activity(ActivityDefinition::new("a", "log"));

        let result = materialize(&definition);
        assert!(matches!(
            result,
            Err(MaterializeError::DuplicateActivityId(id)) if id == "a"
        ));
    }

    #[test]
    fn test_unresolved_connection() {
        let definition = WorkflowDefinition::new("bad", 1)
            .with_activity(ActivityDefinition::new("a", "log"))
            .with_connection(ConnectionDefinition::new("a", "ghost", "Done"));

        let result = materialize(&definition);
        assert!(matches!(
            result,
            Err(MaterializeError::UnresolvedConnection { .. })
        ));
    }

    #[test]
    fn test_nested_composite() {
        let definition = WorkflowDefinition::new("nested", 1).with_activity(
            ActivityDefinition::new("outer", "sequence")
                .with_child(
                    ActivityDefinition::new("inner", "sequence")
                        .with_child(ActivityDefinition::new("leaf", "log"))
                        .with_child(ActivityDefinition::new("leaf2", "log"))
                        .with_child_connection(ConnectionDefinition::new("leaf", "leaf2", "Done")),
                )
                .with_child(ActivityDefinition::new("sibling", "log"))
                .with_child_connection(ConnectionDefinition::new("inner", "sibling", "Done")),
        );

        let blueprint = materialize(&definition).unwrap();

        // Nested activities resolve through the blueprint-wide lookup.
        assert!(blueprint.activity("outer").unwrap().is_composite());
        assert!(blueprint.activity("inner").unwrap().is_composite());
        assert!(blueprint.activity("leaf").is_some());
        assert!(blueprint.activity("sibling").is_some());

        // Connection resolution stays within the declaring scope.
        let from_leaf = blueprint.connections_from("leaf");
        assert_eq!(from_leaf.len(), 1);
        assert_eq!(from_leaf[0].target.id, "leaf2");

        let from_inner = blueprint.connections_from("inner");
        assert_eq!(from_inner.len(), 1);
        assert_eq!(from_inner[0].target.id, "sibling");
    }

    #[test]
    fn test_nested_scope_is_invisible_to_outer_connections() {
        let definition = WorkflowDefinition::new("scoped", 1)
            .with_activity(
                ActivityDefinition::new("outer", "sequence")
                    .with_child(ActivityDefinition::new("hidden", "log")),
            )
            .with_connection(ConnectionDefinition::new("outer", "hidden", "Done"));

        let result = materialize(&definition);
        assert!(matches!(
            result,
            Err(MaterializeError::UnresolvedConnection { .. })
        ));
    }

    #[test]
    fn test_materialization_is_deterministic() {
        let definition = WorkflowDefinition::new("det", 3)
            .with_activity(
                ActivityDefinition::new("a", "log")
                    .with_property("Zeta", PropertyDefinition::literal("z"))
                    .with_property("Alpha", PropertyDefinition::literal("a")),
            )
            .with_activity(ActivityDefinition::new("b", "log"))
            .with_connection(ConnectionDefinition::new("a", "b", "Done"));

        let first = materialize(&definition).unwrap();
        let second = materialize(&definition).unwrap();

        let order = |bp: &Blueprint| bp.activities().map(|a| a.id.clone()).collect::<Vec<_>>();
        assert_eq!(order(&first), order(&second));

        let edges = |bp: &Blueprint| {
            bp.connections
                .iter()
                .map(|c| (c.source.id.clone(), c.target.id.clone(), c.outcome.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(edges(&first), edges(&second));

        assert_eq!(
            first.property_providers_for("a"),
            second.property_providers_for("a")
        );
        // Providers come out name-sorted regardless of declaration order.
        assert_eq!(first.property_providers_for("a")[0].name, "Alpha");
    }
}
