//! Executable workflow blueprints
//!
//! A [`Blueprint`] is the materialized, immutable form of a workflow
//! definition. [`materialize`] builds one; the runner executes it.

mod materializer;
mod model;

pub use materializer::{materialize, MaterializeError};
pub use model::{
    ActivityBlueprint, ActivityFactory, Blueprint, CompositeBody, Connection, PropertyProvider,
};
