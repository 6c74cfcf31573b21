//! Droplet provider
//!
//! A droplet is only ever matched against droplets this tool created: the
//! lookup is by name, restricted to the ids tracked in the state file. An
//! untracked droplet with the same name is left alone and a new one is
//! created next to it.
//!
//! Creation is asynchronous. `POST /droplets` answers 202 with a link to the
//! create action; the [`OperationTracker`] polls that action and the final
//! droplet is fetched once it completes.

use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use tellurian_core::resource::DropletProperties;
use tellurian_core::traits::{DeleteContext, DeleteOutcome, ResourceProvider, StateFile};
use tellurian_core::{
    Error, OperationHandle, OperationSource, OperationStatus, OperationTracker, ResourceData,
    ResourceKind, ResourceProperties, Result,
};

use crate::PROVIDER_NAME;
use crate::client::DigitalOceanClient;
use crate::wire::{
    ActionEnvelope, CreateDropletRequest, CreateDropletResponse, Droplet, DropletActionRequest,
    DropletEnvelope, DropletsEnvelope,
};

/// Page size for droplet listings (API maximum)
const LIST_PAGE_SIZE: &str = "200";

#[derive(Debug, Clone)]
pub struct DropletProvider {
    client: DigitalOceanClient,
    tracker: OperationTracker,
}

impl DropletProvider {
    pub fn new(client: DigitalOceanClient, tracker: OperationTracker) -> Self {
        Self { client, tracker }
    }

    /// Tracked droplet with the given name, if it is still alive
    async fn find_tracked(&self, name: &str, tracked: &HashSet<u64>) -> Result<Option<Droplet>> {
        let listing: DropletsEnvelope = self
            .client
            .get_query(&["droplets"], &[("per_page", LIST_PAGE_SIZE), ("name", name)])
            .await?;

        Ok(listing
            .droplets
            .into_iter()
            .find(|d| d.name == name && tracked.contains(&d.id)))
    }

    async fn apply_action(&self, droplet_id: u64, action: &DropletActionRequest) -> Result<()> {
        let id = droplet_id.to_string();
        let _: ActionEnvelope = self
            .client
            .post(&["droplets", id.as_str(), "actions"], action)
            .await?;
        Ok(())
    }
}

/// In-place changes that bring a live droplet to the desired properties
///
/// Returns `None` when the droplet cannot be changed in place and has to be
/// replaced. Disabling IPv6 is not possible, so only enabling is planned.
pub fn plan_updates(
    live: &Droplet,
    desired: &DropletProperties,
) -> Option<Vec<DropletActionRequest>> {
    if live.region.slug != desired.region {
        return None;
    }

    let mut actions = Vec::new();
    if live.image_ref() != desired.image {
        actions.push(DropletActionRequest::Rebuild {
            image: desired.image.clone(),
        });
    }
    if live.size_slug != desired.size {
        actions.push(DropletActionRequest::Resize {
            size: desired.size.clone(),
        });
    }
    if desired.ipv6 && !live.has_ipv6() {
        actions.push(DropletActionRequest::EnableIpv6);
    }
    Some(actions)
}

fn droplet_properties(properties: &ResourceProperties) -> Result<&DropletProperties> {
    match properties {
        ResourceProperties::Droplet(p) => Ok(p),
        other => Err(Error::invalid_input(format!(
            "droplet provider cannot handle {}",
            other.kind()
        ))),
    }
}

#[async_trait]
impl OperationSource for DropletProvider {
    type Output = ResourceData;

    async fn fetch_status(&self, handle: &OperationHandle) -> Result<OperationStatus> {
        let id = handle.id.to_string();
        let envelope: ActionEnvelope = self.client.get(&["actions", id.as_str()]).await?;
        Ok(envelope.action.operation_status())
    }

    async fn fetch_resource(&self, resource_id: u64) -> Result<ResourceData> {
        let id = resource_id.to_string();
        let envelope: DropletEnvelope = self.client.get(&["droplets", id.as_str()]).await?;
        Ok(ResourceData::Droplet(envelope.droplet.into_data()))
    }
}

#[async_trait]
impl ResourceProvider for DropletProvider {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Droplet
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn exists_and_current(
        &self,
        properties: &ResourceProperties,
        state: &StateFile,
    ) -> Result<bool> {
        let p = droplet_properties(properties)?;

        let tracked = state.tracked_droplet_ids();
        if tracked.is_empty() {
            return Ok(false);
        }

        let Some(live) = self.find_tracked(&p.name, &tracked).await? else {
            tracing::debug!("No tracked droplet named {}", p.name);
            return Ok(false);
        };

        let Some(actions) = plan_updates(&live, p) else {
            tracing::info!(
                "Droplet {} is in {}, wanted {}; it will be replaced",
                p.name,
                live.region.slug,
                p.region
            );
            return Ok(false);
        };

        for action in &actions {
            tracing::info!("Droplet {} ({}): {:?}", p.name, live.id, action);
            if let Err(e) = self.apply_action(live.id, action).await {
                tracing::warn!("Droplet {} action failed: {}", p.name, e);
            }
        }

        Ok(true)
    }

    async fn create(&self, properties: &ResourceProperties) -> Result<ResourceData> {
        let p = droplet_properties(properties)?;

        // A cancelled run provisions nothing
        if self.tracker.is_cancelled() {
            return Err(Error::Cancelled {
                elapsed: Duration::ZERO,
            });
        }

        let accepted: CreateDropletResponse = self
            .client
            .post(&["droplets"], &CreateDropletRequest::from(p))
            .await?;

        let Some(action) = accepted.links.actions.first() else {
            return Err(Error::operation_failed(format!(
                "droplet {} was accepted without a create action",
                p.name
            )));
        };

        tracing::info!(
            "Droplet {} accepted (id {}), tracking action {}",
            p.name,
            accepted.droplet.id,
            action.id
        );
        self.tracker.wait(self, &OperationHandle::new(action.id)).await
    }

    async fn delete(&self, data: &ResourceData, _context: &DeleteContext) -> Result<DeleteOutcome> {
        let ResourceData::Droplet(droplet) = data else {
            return Err(Error::invalid_input(format!(
                "droplet provider cannot delete {}",
                data.kind()
            )));
        };

        let id = droplet.id.to_string();
        self.client.delete(&["droplets", id.as_str()]).await?;

        tracing::info!("Deleted droplet {} ({})", droplet.name, droplet.id);
        Ok(DeleteOutcome::Deleted)
    }
}
