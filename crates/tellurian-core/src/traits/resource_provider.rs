// # Resource Provider Trait
//
// Defines the uniform capability interface the reconciler drives. There is
// one implementation per resource kind.
//
// ## Implementations
//
// - DigitalOcean: `tellurian-provider-digitalocean` crate
//   (domains, DNS records, droplets)
//
// ## Usage
//
// ```rust,ignore
// use tellurian_core::{DeleteContext, ResourceProvider};
//
// if !provider.exists_and_current(&properties, &state).await? {
//     let data = provider.create(&properties).await?;
//     // record `data` in the state file
// }
//
// provider.delete(&data, &DeleteContext::default()).await?;
// ```

use async_trait::async_trait;
use std::collections::HashSet;

use crate::resource::{ResourceData, ResourceKind, ResourceProperties};
use crate::traits::state_store::StateFile;

/// Cross-cutting information for a delete call
///
/// Teardown fills in the domains it is about to delete so that providers of
/// child resources can skip work the parent's deletion already covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteContext {
    domains_being_deleted: HashSet<String>,
}

impl DeleteContext {
    /// Context for a teardown that deletes the given domains
    pub fn with_domains(domains: HashSet<String>) -> Self {
        Self {
            domains_being_deleted: domains,
        }
    }

    /// Whether the domain is scheduled for deletion in the same run
    pub fn is_domain_being_deleted(&self, domain: &str) -> bool {
        self.domains_being_deleted.contains(domain)
    }

    /// Whether deleting a parent already removes this resource
    pub fn cascades(&self, data: &ResourceData) -> bool {
        data.parent_domain()
            .is_some_and(|domain| self.is_domain_being_deleted(domain))
    }
}

/// Result of a delete call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The provider confirmed the deletion
    Deleted,
    /// No request was made
    Skipped {
        /// Why the delete was unnecessary
        reason: String,
    },
}

/// Trait for resource provider implementations
///
/// # Responsibilities
///
/// A provider owns everything that is specific to one resource kind:
/// - how to find an equivalent remote resource
/// - which fields can be changed in place and which force a replacement
/// - how to create and delete the resource
///
/// It does not touch the state store and never decides ordering; both are
/// owned by the reconciler and the teardown orchestrator.
///
/// # Thread Safety
///
/// Implementations must be usable across async tasks.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Kind of resource this provider manages
    fn kind(&self) -> ResourceKind;

    /// Provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;

    /// Check whether an equivalent resource exists and is up to date
    ///
    /// For kinds with mutable fields, a found-but-drifted resource is updated
    /// in place as a side effect and reported as existing.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: nothing to create
    /// - `Ok(false)`: no match, or the match must be replaced
    /// - `Err(Error)`: the check itself failed
    async fn exists_and_current(
        &self,
        properties: &ResourceProperties,
        state: &StateFile,
    ) -> Result<bool, crate::Error>;

    /// Create the resource
    ///
    /// Kinds that complete asynchronously wait for the provider operation to
    /// finish before returning.
    ///
    /// # Returns
    ///
    /// - `Ok(ResourceData)`: what to record in the state file
    /// - `Err(Error)`: the creation failed
    async fn create(&self, properties: &ResourceProperties) -> Result<ResourceData, crate::Error>;

    /// Delete a previously created resource
    async fn delete(
        &self,
        data: &ResourceData,
        context: &DeleteContext,
    ) -> Result<DeleteOutcome, crate::Error>;
}
