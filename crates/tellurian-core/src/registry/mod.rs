//! Plugin-based provider registry
//!
//! The registry maps each [`ResourceKind`] to the provider that manages it,
//! so the reconciler and teardown never branch on kinds themselves.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tellurian_core::registry::ProviderRegistry;
//!
//! let mut registry = ProviderRegistry::new();
//! tellurian_provider_digitalocean::register(&mut registry, &config.provider, tracker)?;
//!
//! let provider = registry.get(ResourceKind::Droplet)?;
//! ```
//!
//! ## Registration
//!
//! Provider crates expose a `register` function that installs one provider
//! per kind they support. Registering a kind twice replaces the earlier
//! provider.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::resource::ResourceKind;
use crate::traits::ResourceProvider;

/// Provider registry keyed by resource kind
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ResourceKind, Arc<dyn ResourceProvider>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under the kind it reports
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let mut registry = ProviderRegistry::new();
    /// registry.register(Arc::new(DomainProvider::new(client.clone())));
    /// ```
    pub fn register(&mut self, provider: Arc<dyn ResourceProvider>) {
        let kind = provider.kind();
        if let Some(previous) = self.providers.insert(kind, provider) {
            tracing::debug!(
                "Replaced provider {} for {}",
                previous.provider_name(),
                kind
            );
        }
    }

    /// Provider for the given kind
    ///
    /// # Returns
    ///
    /// - `Ok(provider)`: the registered provider
    /// - `Err(Error::Config)`: nothing is registered for the kind
    pub fn get(&self, kind: ResourceKind) -> Result<Arc<dyn ResourceProvider>> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::config(format!("No provider registered for {}", kind)))
    }

    /// Check if a provider is registered for the kind
    pub fn has_provider(&self, kind: ResourceKind) -> bool {
        self.providers.contains_key(&kind)
    }

    /// Registered kinds
    pub fn kinds(&self) -> Vec<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .filter(|kind| self.has_provider(*kind))
            .collect()
    }

    /// Fail unless every given kind has a provider
    pub fn ensure_kinds<I>(&self, kinds: I) -> Result<()>
    where
        I: IntoIterator<Item = ResourceKind>,
    {
        let mut missing: Vec<&'static str> = kinds
            .into_iter()
            .filter(|kind| !self.has_provider(*kind))
            .map(|kind| kind.wire_name())
            .collect();

        if missing.is_empty() {
            return Ok(());
        }
        missing.sort_unstable();
        missing.dedup();
        Err(Error::config(format!(
            "No provider registered for {}",
            missing.join(", ")
        )))
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
