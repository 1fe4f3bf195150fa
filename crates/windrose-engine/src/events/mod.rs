//! Lifecycle notifications and their fan-out
//!
//! - [`Notification`] - the event contract published during a run
//! - [`Mediator`] - ordered, failure-isolating delivery to subscribers
//! - [`RecordingHandler`] - in-memory subscriber for tests and audits

mod mediator;
mod notification;

pub use mediator::{Mediator, NotificationHandler, RecordingHandler};
pub use notification::Notification;
