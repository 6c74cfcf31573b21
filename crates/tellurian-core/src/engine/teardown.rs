//! Teardown of everything the state file tracks
//!
//! Teardown never reads the declaration. It walks the state file in append
//! order and deletes each record through its kind's provider. DNS records
//! whose domain is deleted in the same run are skipped without a provider
//! call, since deleting a domain removes its records.
//!
//! Failures are logged and counted but never stop the walk. The state file
//! is emptied at the end regardless of individual failures.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{EngineEvent, emit};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::registry::ProviderRegistry;
use crate::resource::ResourceKind;
use crate::traits::{DeleteContext, DeleteOutcome, StateRecord, StateStore};

/// Per-record result of a teardown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    Deleted,
    Skipped { reason: String },
    Failed { code: &'static str, message: String },
}

/// Outcome of one tracked record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionReport {
    pub identifier: String,
    pub kind: ResourceKind,
    /// Human-readable label of the resource
    pub label: String,
    pub outcome: DeletionOutcome,
}

/// Result of a teardown, in state file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    deletions: Vec<DeletionReport>,
}

impl TeardownReport {
    pub fn deletions(&self) -> &[DeletionReport] {
        &self.deletions
    }

    pub fn deleted(&self) -> usize {
        self.count(|o| matches!(o, DeletionOutcome::Deleted))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DeletionOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DeletionOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, predicate: impl Fn(&DeletionOutcome) -> bool) -> usize {
        self.deletions
            .iter()
            .filter(|d| predicate(&d.outcome))
            .count()
    }
}

/// Deletes every tracked resource and empties the state file
pub struct TeardownOrchestrator {
    registry: Arc<ProviderRegistry>,
    state_store: Arc<dyn StateStore>,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl TeardownOrchestrator {
    /// Create a new orchestrator
    ///
    /// # Returns
    ///
    /// A tuple of (orchestrator, event_receiver)
    pub fn new(
        registry: Arc<ProviderRegistry>,
        state_store: Arc<dyn StateStore>,
        config: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        Ok((
            Self {
                registry,
                state_store,
                event_tx: tx,
            },
            rx,
        ))
    }

    /// Delete everything the state file tracks
    ///
    /// # Returns
    ///
    /// - `Ok(TeardownReport)`: the walk finished and the state was cleared
    /// - `Err(Error::StateStore)`: clearing the state file failed
    pub async fn destroy(&self) -> Result<TeardownReport> {
        let state = self.state_store.load().await;
        let context = DeleteContext::with_domains(state.domain_names());

        info!("Tearing down {} tracked resources", state.len());
        emit(
            &self.event_tx,
            EngineEvent::TeardownStarted {
                records: state.len(),
            },
        );

        let mut report = TeardownReport::default();
        for record in state.records() {
            let outcome = self.delete_record(record, &context).await;
            report.deletions.push(DeletionReport {
                identifier: record.identifier.clone(),
                kind: record.kind(),
                label: record.data.label(),
                outcome,
            });
        }

        self.state_store.clear().await?;
        emit(&self.event_tx, EngineEvent::StateCleared);

        info!(
            "Teardown finished: {} deleted, {} skipped, {} failed",
            report.deleted(),
            report.skipped(),
            report.failed()
        );

        Ok(report)
    }

    async fn delete_record(&self, record: &StateRecord, context: &DeleteContext) -> DeletionOutcome {
        let identifier = record.identifier.clone();
        let kind = record.kind();

        if context.cascades(&record.data) {
            let reason = format!(
                "domain {} is deleted in the same run",
                record.data.parent_domain().unwrap_or_default()
            );
            debug!("Skipping {} ({}): {}", identifier, kind, reason);
            emit(
                &self.event_tx,
                EngineEvent::DeleteSkipped {
                    identifier,
                    kind,
                    reason: reason.clone(),
                },
            );
            return DeletionOutcome::Skipped { reason };
        }

        let deleted = match self.registry.get(kind) {
            Ok(provider) => provider.delete(&record.data, context).await,
            Err(e) => Err(e),
        };

        match deleted {
            Ok(DeleteOutcome::Deleted) => {
                info!("Deleted {} ({}): {}", identifier, kind, record.data.label());
                emit(
                    &self.event_tx,
                    EngineEvent::ResourceDeleted { identifier, kind },
                );
                DeletionOutcome::Deleted
            }
            Ok(DeleteOutcome::Skipped { reason }) => {
                debug!("Provider skipped {} ({}): {}", identifier, kind, reason);
                emit(
                    &self.event_tx,
                    EngineEvent::DeleteSkipped {
                        identifier,
                        kind,
                        reason: reason.clone(),
                    },
                );
                DeletionOutcome::Skipped { reason }
            }
            Err(e) => {
                warn!(
                    "Failed to delete {} ({}): {}",
                    identifier,
                    record.data.label(),
                    e
                );
                emit(
                    &self.event_tx,
                    EngineEvent::DeleteFailed {
                        identifier,
                        kind,
                        error: e.to_string(),
                    },
                );
                DeletionOutcome::Failed {
                    code: e.code(),
                    message: e.to_string(),
                }
            }
        }
    }
}
