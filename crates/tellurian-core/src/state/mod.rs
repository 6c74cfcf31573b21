// # State Store Implementations
//
// This module provides implementations of the StateStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::{DEFAULT_STATE_PATH, FileStateStore};
pub use memory::MemoryStateStore;

use std::sync::Arc;

use crate::config::StateStoreConfig;
use crate::traits::StateStore;

/// Build the state store described by the configuration
pub fn open_store(config: &StateStoreConfig) -> Arc<dyn StateStore> {
    match config {
        StateStoreConfig::File { path } => Arc::new(FileStateStore::new(path)),
        StateStoreConfig::Memory => Arc::new(MemoryStateStore::new()),
    }
}
