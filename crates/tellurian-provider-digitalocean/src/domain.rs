//! Domain (DNS zone) provider
//!
//! - exists: `GET /domains/{name}` answers 200
//! - create: `POST /domains`, optionally with an apex `ip_address`
//! - delete: `DELETE /domains/{name}`, which also removes the zone's records
//!
//! Domains have nothing to update in place.

use async_trait::async_trait;
use tellurian_core::resource::{DomainData, DomainProperties};
use tellurian_core::traits::{DeleteContext, DeleteOutcome, ResourceProvider, StateFile};
use tellurian_core::{Error, ResourceData, ResourceKind, ResourceProperties, Result};

use crate::PROVIDER_NAME;
use crate::client::DigitalOceanClient;
use crate::wire::{CreateDomainRequest, DomainEnvelope};

#[derive(Debug, Clone)]
pub struct DomainProvider {
    client: DigitalOceanClient,
}

impl DomainProvider {
    pub fn new(client: DigitalOceanClient) -> Self {
        Self { client }
    }
}

fn domain_properties(properties: &ResourceProperties) -> Result<&DomainProperties> {
    match properties {
        ResourceProperties::Domain(p) => Ok(p),
        other => Err(Error::invalid_input(format!(
            "domain provider cannot handle {}",
            other.kind()
        ))),
    }
}

#[async_trait]
impl ResourceProvider for DomainProvider {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Domain
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn exists_and_current(
        &self,
        properties: &ResourceProperties,
        _state: &StateFile,
    ) -> Result<bool> {
        let p = domain_properties(properties)?;

        let found = self
            .client
            .get_optional::<DomainEnvelope>(&["domains", p.name.as_str()])
            .await?;

        tracing::debug!("Domain {} exists: {}", p.name, found.is_some());
        Ok(found.is_some())
    }

    async fn create(&self, properties: &ResourceProperties) -> Result<ResourceData> {
        let p = domain_properties(properties)?;

        let request = CreateDomainRequest {
            name: &p.name,
            ip_address: p.ip_address.as_deref(),
        };
        let created: DomainEnvelope = self.client.post(&["domains"], &request).await?;

        tracing::info!("Created domain {}", created.domain.name);
        Ok(ResourceData::Domain(DomainData {
            name: created.domain.name,
            ttl: created.domain.ttl,
        }))
    }

    async fn delete(&self, data: &ResourceData, _context: &DeleteContext) -> Result<DeleteOutcome> {
        let ResourceData::Domain(domain) = data else {
            return Err(Error::invalid_input(format!(
                "domain provider cannot delete {}",
                data.kind()
            )));
        };

        self.client.delete(&["domains", domain.name.as_str()]).await?;

        tracing::info!("Deleted domain {}", domain.name);
        Ok(DeleteOutcome::Deleted)
    }
}
