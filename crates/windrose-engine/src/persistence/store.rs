//! WorkflowInstanceStore trait definition

use async_trait::async_trait;
use uuid::Uuid;

use crate::workflow::{WorkflowInstance, WorkflowStatus};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Workflow instance not found
    #[error("workflow instance not found: {0}")]
    InstanceNotFound(Uuid),

    /// Underlying storage failure
    #[error("storage error: {0}")]
    Storage(String),
}

/// Store for workflow instances
///
/// Persistence happens outside the engine: a host saves instances before
/// and after each run. The engine itself only needs the count query the
/// registry uses to decide whether an unpublished workflow still has live
/// instances. Implementations must be safe for concurrent use.
#[async_trait]
pub trait WorkflowInstanceStore: Send + Sync + 'static {
    /// Save an instance, replacing any previous version
    async fn save(&self, instance: &WorkflowInstance) -> Result<(), StoreError>;

    /// Load an instance by id
    async fn find_by_id(&self, instance_id: Uuid) -> Result<Option<WorkflowInstance>, StoreError>;

    /// Count instances of a definition version, optionally filtered to a
    /// set of statuses
    async fn count_by_definition(
        &self,
        definition_id: &str,
        version: i32,
        statuses: Option<&[WorkflowStatus]>,
    ) -> Result<u64, StoreError>;

    /// Delete an instance
    async fn delete(&self, instance_id: Uuid) -> Result<(), StoreError>;
}
