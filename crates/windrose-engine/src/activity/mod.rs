//! Activity abstractions
//!
//! This module contains the per-activity primitives:
//! - [`Activity`] trait implemented by every unit of work
//! - [`ActivityExecutionContext`] created per dispatch
//! - [`ActivityResult`] variants that advance the run when applied

mod context;
mod definition;
mod result;

pub use context::ActivityExecutionContext;
pub use definition::{Activity, ActivityError};
pub use result::{outcome_names, ActivityResult};
