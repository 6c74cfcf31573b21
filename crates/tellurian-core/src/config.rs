//! Configuration types for the Tellurian reconciler
//!
//! This module defines all configuration structures used throughout the crate.
//! Nothing here reads the process environment; the binary does that once at
//! startup and hands the resulting values in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::state::DEFAULT_STATE_PATH;

/// Default DigitalOcean API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.digitalocean.com/v2";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TellurianConfig {
    /// Provider API configuration
    pub provider: ProviderConfig,

    /// State store configuration
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Async operation polling
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl TellurianConfig {
    /// Create a configuration with defaults around the given credential
    pub fn new(api_token: Credential) -> Self {
        Self {
            provider: ProviderConfig::new(api_token),
            state_store: StateStoreConfig::default(),
            tracker: TrackerConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.state_store.validate()?;
        self.tracker.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// API credential
///
/// The token is never shown by `Debug` or `Display` and cannot be
/// serialized.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token, rejecting empty values
    ///
    /// # Parameters
    ///
    /// - `source`: where the token came from, used in the error message
    /// - `token`: the token itself
    pub fn new(source: &str, token: impl Into<String>) -> Result<Self, crate::Error> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(crate::Error::missing_credential(format!(
                "{} is empty",
                source
            )));
        }
        Ok(Self(token))
    }

    /// Wrap a token that may be absent
    pub fn from_optional(source: &str, token: Option<String>) -> Result<Self, crate::Error> {
        match token {
            Some(token) => Self::new(source, token),
            None => Err(crate::Error::missing_credential(format!(
                "Please set {}",
                source
            ))),
        }
    }

    /// The raw token, for building the authorization header only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<REDACTED>)")
    }
}

/// Provider API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Bearer token used for every provider call
    ///
    /// Read from configuration but never written back out.
    #[serde(skip_serializing)]
    pub api_token: Credential,

    /// API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request HTTP timeout (in seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl ProviderConfig {
    /// Create a provider configuration with default endpoint and timeout
    pub fn new(api_token: Credential) -> Self {
        Self {
            api_token,
            api_base_url: default_api_base_url(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://")
        {
            return Err(crate::Error::config(format!(
                "API base URL must use HTTP or HTTPS scheme. Got: {}",
                self.api_base_url
            )));
        }
        if self.http_timeout_secs == 0 {
            return Err(crate::Error::config("HTTP timeout must be > 0"));
        }
        Ok(())
    }

    /// Per-request timeout
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// State store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// File-based state store
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory state store (not persistent)
    Memory,
}

impl StateStoreConfig {
    /// Validate the state store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StateStoreConfig::File { path } if path.trim().is_empty() => {
                Err(crate::Error::config("State file path cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        StateStoreConfig::File {
            path: DEFAULT_STATE_PATH.to_string(),
        }
    }
}

/// Async operation polling configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Delay between two status polls (in seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Total time to wait for a terminal status (in seconds)
    #[serde(default = "default_poll_timeout_secs")]
    pub timeout_secs: u64,
}

impl TrackerConfig {
    /// Validate the polling configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }
        if self.timeout_secs < self.poll_interval_secs {
            return Err(crate::Error::config(format!(
                "Poll timeout ({}s) must be at least the poll interval ({}s)",
                self.timeout_secs, self.poll_interval_secs
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: default_poll_timeout_secs(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the engine event channel
    ///
    /// When full, events are dropped (with a warning log) rather than
    /// stalling the reconciliation pass.
    ///
    /// Default: 256 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_poll_timeout_secs() -> u64 {
    120
}

fn default_event_channel_capacity() -> usize {
    256
}
