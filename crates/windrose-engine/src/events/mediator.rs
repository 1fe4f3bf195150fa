//! Notification mediator
//!
//! Fans lifecycle notifications out to subscribers. Handlers run
//! synchronously within the run, in registration order; a handler failure
//! is logged and never alters workflow state.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::notification::Notification;

/// A subscriber to lifecycle notifications
///
/// Handlers receive every notification and may inspect but not mutate run
/// state; notifications are value snapshots.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// Handler name, used in failure logs
    fn name(&self) -> &str;

    async fn handle(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Publishes notifications to registered handlers in order
#[derive(Default)]
pub struct Mediator {
    handlers: Vec<Arc<dyn NotificationHandler>>,
}

impl Mediator {
    /// Create a mediator with no handlers
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register a handler (builder style)
    pub fn with_handler(mut self, handler: Arc<dyn NotificationHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Register a handler
    pub fn add_handler(&mut self, handler: Arc<dyn NotificationHandler>) {
        self.handlers.push(handler);
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Publish a notification to every handler, in registration order
    ///
    /// Handler failures are logged and swallowed; delivery continues with
    /// the remaining handlers.
    pub async fn publish(&self, notification: Notification) {
        debug!(kind = notification.kind(), "publishing notification");

        for handler in &self.handlers {
            if let Err(error) = handler.handle(&notification).await {
                warn!(
                    handler = handler.name(),
                    kind = notification.kind(),
                    %error,
                    "notification handler failed"
                );
            }
        }
    }
}

/// Handler that records every notification it receives
///
/// Primarily for testing event ordering; also usable as a simple audit
/// trail in single-process hosts.
#[derive(Default)]
pub struct RecordingHandler {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingHandler {
    /// Create a new empty handler
    pub fn new() -> Self {
        Self {
            notifications: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of everything recorded so far
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    /// Recorded notification kinds, in publication order
    pub fn kinds(&self) -> Vec<&'static str> {
        self.notifications.lock().iter().map(|n| n.kind()).collect()
    }

    /// Clear all recorded notifications
    pub fn clear(&self) {
        self.notifications.lock().clear();
    }
}

#[async_trait]
impl NotificationHandler for RecordingHandler {
    fn name(&self) -> &str {
        "recording"
    }

    async fn handle(&self, notification: &Notification) -> anyhow::Result<()> {
        self.notifications.lock().push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::WorkflowStatus;
    use uuid::Uuid;

    struct FailingHandler;

    #[async_trait]
    impl NotificationHandler for FailingHandler {
        fn name(&self) -> &str {
            "failing"
        }

        async fn handle(&self, _notification: &Notification) -> anyhow::Result<()> {
            anyhow::bail!("handler exploded")
        }
    }

    fn executed(status: WorkflowStatus) -> Notification {
        Notification::WorkflowExecuted {
            workflow_instance_id: Uuid::now_v7(),
            definition_id: "wf".to_string(),
            status,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_all_handlers_in_order() {
        let first = Arc::new(RecordingHandler::new());
        let second = Arc::new(RecordingHandler::new());

        let mediator = Mediator::new()
            .with_handler(first.clone())
            .with_handler(second.clone());

        mediator.publish(executed(WorkflowStatus::Finished)).await;

        assert_eq!(first.kinds(), vec!["workflow_executed"]);
        assert_eq!(second.kinds(), vec!["workflow_executed"]);
    }

    #[tokio::test]
    async fn test_handler_failure_does_not_stop_delivery() {
        let recording = Arc::new(RecordingHandler::new());

        let mediator = Mediator::new()
            .with_handler(Arc::new(FailingHandler))
            .with_handler(recording.clone());

        mediator.publish(executed(WorkflowStatus::Finished)).await;

        assert_eq!(recording.kinds(), vec!["workflow_executed"]);
    }
}
