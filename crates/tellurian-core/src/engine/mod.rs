//! Reconciliation engine
//!
//! The [`Reconciler`] is responsible for:
//! - Asking each action's provider whether the resource already exists
//! - Creating what is missing, in declaration order
//! - Superseding earlier records that carry the same identifier
//! - Persisting the state file once per pass
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ Declaration │─── DesiredAction ───┐
//! └─────────────┘                     │
//!                                     ▼
//!                            ┌──────────────┐
//!                            │  Reconciler  │
//!                            └──────────────┘
//!                                     │
//!         ┌───────────────────────────┼───────────────────────────┐
//!         │                           │                           │
//!         ▼                           ▼                           ▼
//! ┌─────────────┐         ┌──────────────────┐         ┌─────────────┐
//! │ StateStore  │         │ ResourceProvider │         │   Events    │
//! │ (load/save) │         │ (check/create)   │         │  (notify)   │
//! └─────────────┘         └──────────────────┘         └─────────────┘
//! ```
//!
//! ## Action Flow
//!
//! 1. `exists_and_current` → skip when `true`
//! 2. `create` (droplets wait on the operation tracker inside the provider)
//! 3. On success, delete and drop earlier records with the same identifier,
//!    then append the new record
//! 4. On failure, log, report, and move on to the next action
//!
//! Teardown lives in [`teardown`].

pub mod teardown;

pub use teardown::{DeletionOutcome, DeletionReport, TeardownOrchestrator, TeardownReport};

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::declaration::{Declaration, DesiredAction};
use crate::error::{Error, Result};
use crate::registry::ProviderRegistry;
use crate::resource::ResourceKind;
use crate::traits::{DeleteContext, StateFile, StateRecord, StateStore};

/// Events emitted by the reconciler and the teardown orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Reconciliation pass started
    PassStarted { actions: usize },

    /// Resource already exists and is current
    ActionSkipped {
        identifier: String,
        kind: ResourceKind,
    },

    /// Creation started
    CreateStarted {
        identifier: String,
        kind: ResourceKind,
    },

    /// Resource created and recorded
    ActionRecorded {
        identifier: String,
        kind: ResourceKind,
        /// Number of earlier records the new one superseded
        superseded: usize,
    },

    /// Creation failed; state untouched
    ActionFailed {
        identifier: String,
        kind: ResourceKind,
        code: &'static str,
        error: String,
    },

    /// State file written at the end of a pass
    StateSaved { records: usize },

    /// Teardown started
    TeardownStarted { records: usize },

    /// Resource deleted during teardown
    ResourceDeleted {
        identifier: String,
        kind: ResourceKind,
    },

    /// Deletion skipped during teardown
    DeleteSkipped {
        identifier: String,
        kind: ResourceKind,
        reason: String,
    },

    /// Deletion failed during teardown
    DeleteFailed {
        identifier: String,
        kind: ResourceKind,
        error: String,
    },

    /// State file emptied at the end of teardown
    StateCleared,
}

/// Per-action result of a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// An equivalent, current resource already existed
    Skipped,
    /// Created; no earlier record carried the identifier
    Created,
    /// Created; earlier records with the identifier were superseded
    Replaced { superseded: usize },
    /// Creation failed
    Failed { code: &'static str, message: String },
}

/// Outcome of one declared action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub identifier: String,
    pub kind: ResourceKind,
    pub outcome: ActionOutcome,
}

/// Result of a reconciliation pass, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    actions: Vec<ActionReport>,
}

impl ReconcileReport {
    /// Per-action outcomes
    pub fn actions(&self) -> &[ActionReport] {
        &self.actions
    }

    /// Outcome for the given identifier
    pub fn outcome(&self, identifier: &str) -> Option<&ActionOutcome> {
        self.actions
            .iter()
            .find(|a| a.identifier == identifier)
            .map(|a| &a.outcome)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Skipped))
    }

    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Created))
    }

    pub fn replaced(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Replaced { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Failed { .. }))
    }

    /// Whether any action failed
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, predicate: impl Fn(&ActionOutcome) -> bool) -> usize {
        self.actions.iter().filter(|a| predicate(&a.outcome)).count()
    }
}

/// Applies a declaration against the provider and the state file
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Call [`Reconciler::apply()`] once per pass
/// 3. Drain the event receiver for monitoring/logging
///
/// ## Ordering
///
/// Actions run strictly one after another. A droplet that is still
/// provisioning blocks the pass until its operation finishes or times out.
pub struct Reconciler {
    /// Providers keyed by resource kind
    registry: Arc<ProviderRegistry>,

    /// Persisted record of created resources
    state_store: Arc<dyn StateStore>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields
    /// engine events
    pub fn new(
        registry: Arc<ProviderRegistry>,
        state_store: Arc<dyn StateStore>,
        config: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let reconciler = Self {
            registry,
            state_store,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Run one reconciliation pass
    ///
    /// # Returns
    ///
    /// - `Ok(ReconcileReport)`: the pass ran and the state file was saved;
    ///   individual actions may still have failed
    /// - `Err(Error::InvalidDeclaration)`: nothing was loaded, called or saved
    /// - `Err(Error::Config)`: an action's kind has no provider
    /// - `Err(Error::StateStore)`: the final save failed
    pub async fn apply(&self, declaration: &Declaration) -> Result<ReconcileReport> {
        declaration.validate()?;
        self.registry.ensure_kinds(declaration.kinds())?;

        let mut state = self.state_store.load().await;
        debug!(
            "Loaded {} records from {} state store",
            state.len(),
            self.state_store.store_name()
        );

        self.emit_event(EngineEvent::PassStarted {
            actions: declaration.len(),
        });

        let mut report = ReconcileReport::default();
        for action in declaration.actions() {
            let outcome = self.reconcile_action(action, &mut state).await;
            report.actions.push(ActionReport {
                identifier: action.identifier.clone(),
                kind: action.kind(),
                outcome,
            });
        }

        self.state_store.save(&state).await?;
        self.emit_event(EngineEvent::StateSaved {
            records: state.len(),
        });

        info!(
            "Pass finished: {} created, {} replaced, {} skipped, {} failed",
            report.created(),
            report.replaced(),
            report.skipped(),
            report.failed()
        );

        Ok(report)
    }

    /// Drive one action through check → create → record
    async fn reconcile_action(&self, action: &DesiredAction, state: &mut StateFile) -> ActionOutcome {
        let identifier = action.identifier.as_str();
        let kind = action.kind();

        let provider = match self.registry.get(kind) {
            Ok(provider) => provider,
            Err(e) => return self.fail(action, e),
        };

        match provider.exists_and_current(&action.properties, state).await {
            Ok(true) => {
                debug!("{} ({}) exists and is current, skipping", identifier, kind);
                self.emit_event(EngineEvent::ActionSkipped {
                    identifier: identifier.to_string(),
                    kind,
                });
                return ActionOutcome::Skipped;
            }
            Ok(false) => {
                debug!("{} ({}) needs creation", identifier, kind);
            }
            Err(e) => {
                warn!(
                    "Could not check {} ({}), assuming it must be created: {}",
                    identifier, kind, e
                );
            }
        }

        self.emit_event(EngineEvent::CreateStarted {
            identifier: identifier.to_string(),
            kind,
        });

        let data = match provider.create(&action.properties).await {
            Ok(data) => data,
            Err(e) => return self.fail(action, e),
        };

        info!("Created {} ({}): {}", identifier, kind, data.label());

        let superseded = self.supersede(identifier, state).await;
        state.push(StateRecord::new(identifier, data));

        self.emit_event(EngineEvent::ActionRecorded {
            identifier: identifier.to_string(),
            kind,
            superseded,
        });

        if superseded == 0 {
            ActionOutcome::Created
        } else {
            ActionOutcome::Replaced { superseded }
        }
    }

    /// Delete and forget every record with the identifier
    ///
    /// Delete failures are logged; the records are dropped either way.
    async fn supersede(&self, identifier: &str, state: &mut StateFile) -> usize {
        let previous = state.remove_identifier(identifier);

        for record in &previous {
            let deleted = match self.registry.get(record.kind()) {
                Ok(provider) => provider.delete(&record.data, &DeleteContext::default()).await,
                Err(e) => Err(e),
            };

            match deleted {
                Ok(_) => info!(
                    "Deleted superseded {} ({}): {}",
                    identifier,
                    record.kind(),
                    record.data.label()
                ),
                Err(e) => warn!(
                    "Failed to delete superseded {} ({}): {}",
                    identifier,
                    record.data.label(),
                    e
                ),
            }
        }

        previous.len()
    }

    fn fail(&self, action: &DesiredAction, error: Error) -> ActionOutcome {
        warn!(
            "Failed to create {} ({}): {}",
            action.identifier,
            action.kind(),
            error
        );
        self.emit_event(EngineEvent::ActionFailed {
            identifier: action.identifier.clone(),
            kind: action.kind(),
            code: error.code(),
            error: error.to_string(),
        });
        ActionOutcome::Failed {
            code: error.code(),
            message: error.to_string(),
        }
    }

    fn emit_event(&self, event: EngineEvent) {
        emit(&self.event_tx, event);
    }
}

/// Send an event without blocking
///
/// A full channel means the consumer is slower than the pass; the event is
/// dropped with a warning.
pub(crate) fn emit(tx: &mpsc::Sender<EngineEvent>, event: EngineEvent) {
    if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(event) {
        warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
    }
}
