//! Core traits for the Tellurian reconciler
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`ResourceProvider`]: Create, check and delete one kind of remote resource
//! - [`StateStore`]: Persisted record of created resources

pub mod resource_provider;
pub mod state_store;

pub use resource_provider::{DeleteContext, DeleteOutcome, ResourceProvider};
pub use state_store::{StateFile, StateRecord, StateStore};
