//! Async operation tracking
//!
//! Some provider calls only start work: the provider answers right away with
//! an operation handle and finishes the resource in the background. The
//! [`OperationTracker`] polls such an operation at a fixed interval until it
//! reaches a terminal status or the ceiling is hit.
//!
//! ## Timing
//!
//! ```text
//! sleep(interval) → poll → sleep(interval) → poll → ... → poll at ceiling
//! ```
//!
//! Elapsed time is accumulated from the sleeps. The last sleep is clamped so
//! that a never-finishing operation gives up after exactly the ceiling.
//!
//! ## Progress & Cancellation
//!
//! Progress goes out as [`OperationProgress`] values on an optional bounded
//! channel. An optional `watch` signal aborts the wait with
//! [`Error::Cancelled`].

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::config::TrackerConfig;
use crate::error::{Error, Result};

/// Handle of a running provider operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationHandle {
    /// Provider-assigned operation id
    pub id: u64,
}

impl OperationHandle {
    pub fn new(id: u64) -> Self {
        Self { id }
    }
}

/// Status of a provider operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    /// Still running
    InProgress,
    /// Finished; the resource can be fetched
    Completed {
        /// Id of the resource the operation produced
        resource_id: u64,
    },
    /// Finished without producing the resource
    Errored {
        /// Provider-reported reason, if any
        reason: String,
    },
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// One progress observation while waiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationProgress {
    /// Operation being waited on
    pub handle: OperationHandle,
    /// Time spent waiting so far
    pub elapsed: Duration,
    /// Number of status polls made so far
    pub polls: u32,
}

/// Where operation status and finished resources come from
///
/// Implemented by providers whose creation is asynchronous.
#[async_trait]
pub trait OperationSource: Send + Sync {
    /// What a completed operation resolves to
    type Output: Send;

    /// Fetch the current status of the operation
    async fn fetch_status(&self, handle: &OperationHandle) -> Result<OperationStatus>;

    /// Fetch the finished resource
    async fn fetch_resource(&self, resource_id: u64) -> Result<Self::Output>;
}

/// Polls provider operations until they finish
#[derive(Debug, Clone)]
pub struct OperationTracker {
    poll_interval: Duration,
    timeout: Duration,
    progress: Option<mpsc::Sender<OperationProgress>>,
    cancel: Option<watch::Receiver<bool>>,
}

impl OperationTracker {
    /// Create a tracker with the given poll interval and ceiling
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
            progress: None,
            cancel: None,
        }
    }

    /// Create a tracker from configuration
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(config.poll_interval(), config.timeout())
    }

    /// Report progress on the given channel
    ///
    /// When the channel is full, observations are dropped with a warning.
    pub fn with_progress(mut self, progress: mpsc::Sender<OperationProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Abort waits once the signal turns `true`
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Whether the cancellation signal has fired
    ///
    /// Providers check this before starting an operation. A dropped sender
    /// never counts as cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for an operation to reach a terminal status
    ///
    /// # Returns
    ///
    /// - `Ok(Output)`: the operation completed and its resource was fetched
    /// - `Err(Error::ProviderOperationFailed)`: the operation errored
    /// - `Err(Error::TimedOut)`: no terminal status within the ceiling
    /// - `Err(Error::Cancelled)`: the cancellation signal fired
    ///
    /// A failed status fetch is logged and does not end the wait.
    pub async fn wait<S>(&self, source: &S, handle: &OperationHandle) -> Result<S::Output>
    where
        S: OperationSource + ?Sized,
    {
        let mut elapsed = Duration::ZERO;
        let mut polls: u32 = 0;
        let mut cancel = self.cancel.clone();

        loop {
            let step = self.poll_interval.min(self.timeout.saturating_sub(elapsed));

            tokio::select! {
                _ = tokio::time::sleep(step) => {}
                _ = cancelled(&mut cancel) => {
                    debug!("Wait for operation {} cancelled after {:?}", handle.id, elapsed);
                    return Err(Error::Cancelled { elapsed });
                }
            }

            elapsed += step;
            polls += 1;

            match source.fetch_status(handle).await {
                Ok(OperationStatus::Completed { resource_id }) => {
                    debug!(
                        "Operation {} completed after {:?} ({} polls)",
                        handle.id, elapsed, polls
                    );
                    return source.fetch_resource(resource_id).await;
                }
                Ok(OperationStatus::Errored { reason }) => {
                    return Err(Error::operation_failed(format!(
                        "operation {} errored: {}",
                        handle.id, reason
                    )));
                }
                Ok(OperationStatus::InProgress) => {
                    debug!("Still creating... {}s", elapsed.as_secs());
                    self.report(OperationProgress {
                        handle: *handle,
                        elapsed,
                        polls,
                    });
                }
                Err(e) => {
                    warn!("Failed to fetch status of operation {}: {}", handle.id, e);
                }
            }

            if elapsed >= self.timeout {
                return Err(Error::TimedOut { elapsed });
            }
        }
    }

    fn report(&self, progress: OperationProgress) {
        if let Some(tx) = &self.progress {
            if tx.try_send(progress).is_err() {
                warn!("Progress channel full or closed, dropping progress update");
            }
        }
    }
}

/// Resolve once the signal is `true`; never resolves without a live signal
async fn cancelled(signal: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = signal else {
        return std::future::pending().await;
    };
    let fired = rx.wait_for(|cancel| *cancel).await.map(|_| ());
    if fired.is_err() {
        std::future::pending::<()>().await;
    }
}
