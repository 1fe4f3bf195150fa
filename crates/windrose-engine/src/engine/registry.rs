//! Workflow registry
//!
//! The registry is the source of executable blueprints. Providers expose
//! them as lazy streams; the registry resolves a specific definition
//! version for an instance, and lists the workflows currently considered
//! active. An unpublished workflow stays active while non-terminal
//! instances of it remain in the store.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::RwLock;

use crate::blueprint::Blueprint;
use crate::events::{Mediator, Notification};
use crate::persistence::{StoreError, WorkflowInstanceStore};
use crate::workflow::WorkflowStatus;

/// A source of blueprints
pub trait WorkflowProvider: Send + Sync {
    /// Provider name, for diagnostics
    fn name(&self) -> &str;

    /// Lazily enumerate this provider's blueprints
    fn workflows(&self) -> BoxStream<'_, Arc<Blueprint>>;
}

/// Per-workflow settings consulted at listing time
#[async_trait]
pub trait WorkflowSettingsProvider: Send + Sync {
    /// Whether listing should skip this definition
    async fn is_disabled(&self, definition_id: &str) -> bool;
}

/// Settings provider that disables nothing (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullWorkflowSettingsProvider;

#[async_trait]
impl WorkflowSettingsProvider for NullWorkflowSettingsProvider {
    async fn is_disabled(&self, _definition_id: &str) -> bool {
        false
    }
}

/// In-memory provider over explicitly registered blueprints
#[derive(Default)]
pub struct ProgrammaticWorkflowProvider {
    blueprints: RwLock<Vec<Arc<Blueprint>>>,
}

impl ProgrammaticWorkflowProvider {
    /// Create an empty provider
    pub fn new() -> Self {
        Self {
            blueprints: RwLock::new(Vec::new()),
        }
    }

    /// Register a blueprint
    pub fn add(&self, blueprint: Arc<Blueprint>) {
        self.blueprints.write().push(blueprint);
    }

    /// Number of registered blueprints
    pub fn len(&self) -> usize {
        self.blueprints.read().len()
    }

    /// Check whether the provider is empty
    pub fn is_empty(&self) -> bool {
        self.blueprints.read().is_empty()
    }
}

impl WorkflowProvider for ProgrammaticWorkflowProvider {
    fn name(&self) -> &str {
        "programmatic"
    }

    fn workflows(&self) -> BoxStream<'_, Arc<Blueprint>> {
        stream::iter(self.blueprints.read().clone()).boxed()
    }
}

/// Errors from registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Store error while deciding whether a workflow is active
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Resolves blueprints for instances and lists active workflows
pub struct WorkflowRegistry {
    providers: Vec<Arc<dyn WorkflowProvider>>,
    store: Arc<dyn WorkflowInstanceStore>,
    settings: Arc<dyn WorkflowSettingsProvider>,
    mediator: Arc<Mediator>,
}

impl WorkflowRegistry {
    pub fn new(store: Arc<dyn WorkflowInstanceStore>, mediator: Arc<Mediator>) -> Self {
        Self {
            providers: Vec::new(),
            store,
            settings: Arc::new(NullWorkflowSettingsProvider),
            mediator,
        }
    }

    /// Register a provider (builder style)
    pub fn with_provider(mut self, provider: Arc<dyn WorkflowProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Register a provider
    pub fn add_provider(&mut self, provider: Arc<dyn WorkflowProvider>) {
        self.providers.push(provider);
    }

    /// Replace the settings provider
    pub fn with_settings(mut self, settings: Arc<dyn WorkflowSettingsProvider>) -> Self {
        self.settings = settings;
        self
    }

    /// Find the blueprint an instance was created from
    ///
    /// Matches on definition id and the instance's pinned version; `None`
    /// when the definition has been removed.
    pub async fn get_by_instance(
        &self,
        definition_id: &str,
        version: i32,
    ) -> Option<Arc<Blueprint>> {
        for provider in &self.providers {
            let mut workflows = provider.workflows();
            while let Some(blueprint) = workflows.next().await {
                if blueprint.definition_id == definition_id && blueprint.version == version {
                    return Some(blueprint);
                }
            }
        }

        None
    }

    /// List the workflows currently eligible to start
    ///
    /// A workflow is active when it is enabled, not disabled by settings,
    /// and either published or still referenced by non-terminal
    /// instances. Publishes `WorkflowSettingsLoaded` for every inspected
    /// workflow.
    pub async fn list_active(&self) -> Result<Vec<Arc<Blueprint>>, RegistryError> {
        let mut active = Vec::new();

        for provider in &self.providers {
            let mut workflows = provider.workflows();
            while let Some(blueprint) = workflows.next().await {
                let is_disabled = self.settings.is_disabled(&blueprint.definition_id).await;

                self.mediator
                    .publish(Notification::WorkflowSettingsLoaded {
                        definition_id: blueprint.definition_id.clone(),
                        version: blueprint.version,
                        is_disabled,
                    })
                    .await;

                if !blueprint.is_enabled || is_disabled {
                    continue;
                }

                if blueprint.is_published {
                    active.push(blueprint);
                    continue;
                }

                let open = self
                    .store
                    .count_by_definition(
                        &blueprint.definition_id,
                        blueprint.version,
                        Some(&[
                            WorkflowStatus::Idle,
                            WorkflowStatus::Running,
                            WorkflowStatus::Suspended,
                        ]),
                    )
                    .await?;

                if open > 0 {
                    active.push(blueprint);
                }
            }
        }

        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::materialize;
    use crate::events::RecordingHandler;
    use crate::persistence::InMemoryWorkflowInstanceStore;
    use crate::workflow::{WorkflowDefinition, WorkflowFactory};

    fn blueprint_with(id: &str, version: i32, published: bool, enabled: bool) -> Arc<Blueprint> {
        let mut definition = WorkflowDefinition::new(id, version);
        definition.is_published = published;
        definition.is_enabled = enabled;
        Arc::new(materialize(&definition).unwrap())
    }

    fn registry_with(
        store: Arc<InMemoryWorkflowInstanceStore>,
        blueprints: Vec<Arc<Blueprint>>,
    ) -> WorkflowRegistry {
        let provider = ProgrammaticWorkflowProvider::new();
        for blueprint in blueprints {
            provider.add(blueprint);
        }

        WorkflowRegistry::new(store, Arc::new(Mediator::new())).with_provider(Arc::new(provider))
    }

    #[tokio::test]
    async fn test_get_by_instance_matches_version() {
        let store = Arc::new(InMemoryWorkflowInstanceStore::new());
        let registry = registry_with(
            store,
            vec![
                blueprint_with("wf", 1, true, true),
                blueprint_with("wf", 2, true, true),
            ],
        );

        let found = registry.get_by_instance("wf", 2).await.unwrap();
        assert_eq!(found.version, 2);

        assert!(registry.get_by_instance("wf", 3).await.is_none());
        assert!(registry.get_by_instance("other", 1).await.is_none());
    }

    #[tokio::test]
    async fn test_list_active_includes_published_only_when_enabled() {
        let store = Arc::new(InMemoryWorkflowInstanceStore::new());
        let registry = registry_with(
            store,
            vec![
                blueprint_with("published", 1, true, true),
                blueprint_with("disabled", 1, true, false),
                blueprint_with("draft", 1, false, true),
            ],
        );

        let active = registry.list_active().await.unwrap();
        let ids: Vec<_> = active.iter().map(|b| b.definition_id.as_str()).collect();

        assert_eq!(ids, vec!["published"]);
    }

    #[tokio::test]
    async fn test_unpublished_stays_active_with_open_instances() {
        let store = Arc::new(InMemoryWorkflowInstanceStore::new());
        let draft = blueprint_with("draft", 1, false, true);

        let mut instance = WorkflowFactory::new().instantiate(&draft, None, None);
        instance.status = WorkflowStatus::Suspended;
        store.save(&instance).await.unwrap();

        let registry = registry_with(store, vec![draft]);
        let active = registry.list_active().await.unwrap();

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].definition_id, "draft");
    }

    #[tokio::test]
    async fn test_list_active_publishes_settings_loaded() {
        let store = Arc::new(InMemoryWorkflowInstanceStore::new());
        let recording = Arc::new(RecordingHandler::new());

        let provider = ProgrammaticWorkflowProvider::new();
        provider.add(blueprint_with("wf", 1, true, true));

        let mediator = Arc::new(Mediator::new().with_handler(recording.clone()));
        let registry =
            WorkflowRegistry::new(store, mediator).with_provider(Arc::new(provider));

        registry.list_active().await.unwrap();

        assert_eq!(recording.kinds(), vec!["workflow_settings_loaded"]);
    }
}
