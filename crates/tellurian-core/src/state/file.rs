// # File State Store
//
// File-based implementation of StateStore.
//
// ## Purpose
//
// Persists the records of created resources between runs so that a second
// `apply` recognises its own droplets and `destroy` knows what to delete.
//
// ## Crash Safety
//
// - Atomic writes: new state is written to a sibling `.tmp` file, flushed,
//   then renamed over the state file
// - A failed write leaves the previous file untouched
// - Corrupt or empty files load as an empty state
//
// ## File Format
//
// ```json
// [
//   {
//     "identifier": "main-domain",
//     "resource": "DO_DOMAIN",
//     "data": { "name": "example.com", "ttl": 1800 },
//     "created_at": "2025-01-09T12:00:00Z"
//   }
// ]
// ```
//
// After teardown the file is zero-length rather than `[]`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::state_store::{StateFile, StateStore};

/// Default state file name, relative to the working directory
pub const DEFAULT_STATE_PATH: &str = "tellurian.tlstate";

/// File-based state store
///
/// # Example
///
/// ```rust,no_run
/// use tellurian_core::state::FileStateStore;
/// use tellurian_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("tellurian.tlstate");
///
///     let state = store.load().await;
///     store.save(&state).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store backed by the given path
    ///
    /// Nothing is read or created until the first `load`/`save`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse state file contents
    ///
    /// Empty or whitespace-only content is an empty state.
    fn parse(content: &str) -> Result<StateFile, Error> {
        if content.trim().is_empty() {
            return Ok(StateFile::new());
        }
        Ok(serde_json::from_str(content)?)
    }

    /// Write bytes to the state file atomically
    async fn write_atomic(&self, bytes: &[u8]) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::state_store(format!(
                        "Failed to create state directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        // Write to temporary file first
        let temp_path = self.temp_path();
        let written = async {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(bytes).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        // Atomic rename (temp -> actual)
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        PathBuf::from(temp)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> StateFile {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("State file does not exist: {}", self.path.display());
                return StateFile::new();
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read state file {}: {}. Starting with empty state.",
                    self.path.display(),
                    e
                );
                return StateFile::new();
            }
        };

        match Self::parse(&content) {
            Ok(state) => {
                tracing::debug!("Loaded state from file: {} records", state.len());
                state
            }
            Err(e) => {
                tracing::warn!(
                    "State file {} is not valid state ({}). Starting with empty state.",
                    self.path.display(),
                    e
                );
                StateFile::new()
            }
        }
    }

    async fn save(&self, state: &StateFile) -> Result<(), Error> {
        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| Error::state_store(format!("Failed to serialize state: {}", e)))?;
        self.write_atomic(&json).await?;
        tracing::debug!(
            "Saved {} records to {}",
            state.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.write_atomic(b"").await?;
        tracing::debug!("Cleared state file {}", self.path.display());
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "file"
    }
}
