// # tellurian-core
//
// Core library for the declarative infrastructure reconciler.
//
// ## Architecture Overview
//
// This library provides the provider-independent parts of the reconciler:
// - **Declaration**: Parsed and validated list of desired resources
// - **ResourceProvider**: Trait for checking, creating and deleting one kind of resource
// - **StateStore**: Trait for the persisted record of created resources
// - **OperationTracker**: Polls long-running provider operations to completion
// - **Reconciler**: Applies a declaration, one action at a time
// - **TeardownOrchestrator**: Deletes everything the state file tracks
// - **ProviderRegistry**: Providers keyed by resource kind
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider APIs
// 2. **Validate Once**: A `Declaration` only exists after validation
// 3. **Plugin-Based**: Providers are registered per kind, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: Repeated passes without drift change nothing

pub mod config;
pub mod declaration;
pub mod engine;
pub mod error;
pub mod registry;
pub mod resource;
pub mod state;
pub mod tracker;
pub mod traits;

// Re-export core types for convenience
pub use config::{Credential, EngineConfig, ProviderConfig, StateStoreConfig, TellurianConfig, TrackerConfig};
pub use declaration::{Declaration, DesiredAction};
pub use engine::{
    ActionOutcome, ActionReport, DeletionOutcome, EngineEvent, ReconcileReport, Reconciler,
    TeardownOrchestrator, TeardownReport,
};
pub use error::{Error, Result};
pub use registry::ProviderRegistry;
pub use resource::{ResourceData, ResourceKind, ResourceProperties};
pub use state::{FileStateStore, MemoryStateStore};
pub use tracker::{OperationHandle, OperationProgress, OperationSource, OperationStatus, OperationTracker};
pub use traits::{DeleteContext, DeleteOutcome, ResourceProvider, StateFile, StateRecord, StateStore};
