// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Provides a state store that doesn't persist across restarts.
// Useful for testing and for embedding the reconciler in a process that
// keeps its own records.
//
// ## Crash Behavior
//
// - All state is lost on restart/crash
// - The next run treats every droplet as untracked and recreates what the
//   declaration asks for

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{StateFile, StateStore};

/// In-memory state store implementation
///
/// Clones share the same underlying state, so a test can hand one clone to
/// the reconciler and inspect the other afterwards.
///
/// # Example
///
/// ```rust,no_run
/// use tellurian_core::state::MemoryStateStore;
/// use tellurian_core::traits::{StateFile, StateStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///     store.save(&StateFile::new()).await?;
///     assert_eq!(store.save_count(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<StateFile>>,
    saves: Arc<AtomicUsize>,
    clears: Arc<AtomicUsize>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given state
    pub fn with_state(state: StateFile) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
            ..Self::default()
        }
    }

    /// Current contents
    pub async fn snapshot(&self) -> StateFile {
        self.inner.read().await.clone()
    }

    /// Number of successful `save` calls
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of successful `clear` calls
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> StateFile {
        self.inner.read().await.clone()
    }

    async fn save(&self, state: &StateFile) -> Result<(), Error> {
        *self.inner.write().await = state.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        *self.inner.write().await = StateFile::new();
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
