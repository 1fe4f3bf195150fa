//! In-memory implementation of WorkflowInstanceStore for testing

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::workflow::{WorkflowInstance, WorkflowStatus};

use super::store::{StoreError, WorkflowInstanceStore};

/// In-memory implementation of WorkflowInstanceStore
///
/// This is primarily for testing and single-process hosts. It stores all
/// instances in memory with the same semantics a database-backed store
/// would provide.
#[derive(Default)]
pub struct InMemoryWorkflowInstanceStore {
    instances: RwLock<HashMap<Uuid, WorkflowInstance>>,
}

impl InMemoryWorkflowInstanceStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Get the number of stored instances
    pub fn instance_count(&self) -> usize {
        self.instances.read().len()
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        self.instances.write().clear();
    }
}

#[async_trait]
impl WorkflowInstanceStore for InMemoryWorkflowInstanceStore {
    async fn save(&self, instance: &WorkflowInstance) -> Result<(), StoreError> {
        self.instances.write().insert(instance.id, instance.clone());
        Ok(())
    }

    async fn find_by_id(&self, instance_id: Uuid) -> Result<Option<WorkflowInstance>, StoreError> {
        Ok(self.instances.read().get(&instance_id).cloned())
    }

    async fn count_by_definition(
        &self,
        definition_id: &str,
        version: i32,
        statuses: Option<&[WorkflowStatus]>,
    ) -> Result<u64, StoreError> {
        let instances = self.instances.read();
        let count = instances
            .values()
            .filter(|instance| {
                instance.definition_id == definition_id
                    && instance.version == version
                    && statuses
                        .map(|wanted| wanted.contains(&instance.status))
                        .unwrap_or(true)
            })
            .count();

        Ok(count as u64)
    }

    async fn delete(&self, instance_id: Uuid) -> Result<(), StoreError> {
        self.instances
            .write()
            .remove(&instance_id)
            .map(|_| ())
            .ok_or(StoreError::InstanceNotFound(instance_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::materialize;
    use crate::workflow::{WorkflowDefinition, WorkflowFactory};

    fn make_instance(definition_id: &str, version: i32, status: WorkflowStatus) -> WorkflowInstance {
        let definition = WorkflowDefinition::new(definition_id, version);
        let blueprint = materialize(&definition).unwrap();
        let mut instance = WorkflowFactory::new().instantiate(&blueprint, None, None);
        instance.status = status;
        instance
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let store = InMemoryWorkflowInstanceStore::new();
        let instance = make_instance("wf", 1, WorkflowStatus::Idle);

        store.save(&instance).await.unwrap();

        let loaded = store.find_by_id(instance.id).await.unwrap();
        assert_eq!(loaded, Some(instance));
        assert_eq!(store.instance_count(), 1);
    }

    #[tokio::test]
    async fn test_count_by_definition_filters_statuses() {
        let store = InMemoryWorkflowInstanceStore::new();
        store
            .save(&make_instance("wf", 1, WorkflowStatus::Running))
            .await
            .unwrap();
        store
            .save(&make_instance("wf", 1, WorkflowStatus::Finished))
            .await
            .unwrap();
        store
            .save(&make_instance("wf", 2, WorkflowStatus::Running))
            .await
            .unwrap();

        let all = store.count_by_definition("wf", 1, None).await.unwrap();
        assert_eq!(all, 2);

        let running = store
            .count_by_definition("wf", 1, Some(&[WorkflowStatus::Running]))
            .await
            .unwrap();
        assert_eq!(running, 1);

        let other_version = store
            .count_by_definition("wf", 2, Some(&[WorkflowStatus::Running]))
            .await
            .unwrap();
        assert_eq!(other_version, 1);
    }

    #[tokio::test]
    async fn test_delete_missing_instance() {
        let store = InMemoryWorkflowInstanceStore::new();
        let result = store.delete(Uuid::now_v7()).await;

        assert!(matches!(result, Err(StoreError::InstanceNotFound(_))));
    }
}
