//! DNS record provider
//!
//! Records are identified by (domain, type, name). A record that exists with
//! different data is updated in place with `PUT` and reported as existing.
//! Only A, AAAA and CNAME records are managed.
//!
//! Deleting a record whose domain is deleted in the same teardown is skipped,
//! since the domain deletion removes it.

use async_trait::async_trait;
use tellurian_core::resource::{DnsRecordProperties, DnsRecordType};
use tellurian_core::traits::{DeleteContext, DeleteOutcome, ResourceProvider, StateFile};
use tellurian_core::{Error, ResourceData, ResourceKind, ResourceProperties, Result};

use crate::PROVIDER_NAME;
use crate::client::DigitalOceanClient;
use crate::wire::{
    CreateRecordRequest, DomainRecord, DomainRecordEnvelope, DomainRecordsEnvelope,
    UpdateRecordRequest,
};

#[derive(Debug, Clone)]
pub struct DnsRecordProvider {
    client: DigitalOceanClient,
}

impl DnsRecordProvider {
    pub fn new(client: DigitalOceanClient) -> Self {
        Self { client }
    }

    /// First record matching the desired identity
    ///
    /// ```http
    /// GET /domains/example.com/records?type=A&name=www.example.com
    /// ```
    async fn find(&self, p: &DnsRecordProperties) -> Result<Option<DomainRecord>> {
        let fqdn = p.fqdn();
        let envelope: DomainRecordsEnvelope = self
            .client
            .get_query(
                &["domains", p.domain.as_str(), "records"],
                &lookup_query(p.record_type, &fqdn),
            )
            .await?;
        Ok(envelope.domain_records.into_iter().next())
    }

    async fn update_data(&self, p: &DnsRecordProperties, record_id: u64) -> Result<()> {
        let id = record_id.to_string();
        let _: DomainRecordEnvelope = self
            .client
            .put(
                &["domains", p.domain.as_str(), "records", id.as_str()],
                &UpdateRecordRequest { data: &p.data },
            )
            .await?;
        Ok(())
    }
}

/// Lookup query for a record; the API filters by fully qualified name
pub fn lookup_query(record_type: DnsRecordType, fqdn: &str) -> [(&'static str, &str); 2] {
    [("type", record_type.as_str()), ("name", fqdn)]
}

/// Whether the live record data already matches the desired data
///
/// CNAME targets compare without their trailing dot and case-insensitively.
pub fn data_matches(record_type: DnsRecordType, live: &str, desired: &str) -> bool {
    match record_type {
        DnsRecordType::Cname => live
            .trim_end_matches('.')
            .eq_ignore_ascii_case(desired.trim_end_matches('.')),
        DnsRecordType::A | DnsRecordType::Aaaa => live == desired,
    }
}

fn record_properties(properties: &ResourceProperties) -> Result<&DnsRecordProperties> {
    match properties {
        ResourceProperties::DnsRecord(p) => Ok(p),
        other => Err(Error::invalid_input(format!(
            "DNS record provider cannot handle {}",
            other.kind()
        ))),
    }
}

#[async_trait]
impl ResourceProvider for DnsRecordProvider {
    fn kind(&self) -> ResourceKind {
        ResourceKind::DnsRecord
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn exists_and_current(
        &self,
        properties: &ResourceProperties,
        _state: &StateFile,
    ) -> Result<bool> {
        let p = record_properties(properties)?;

        let Some(record) = self.find(p).await? else {
            tracing::debug!("No {} record {}", p.record_type, p.fqdn());
            return Ok(false);
        };

        if !data_matches(p.record_type, &record.data, &p.data) {
            tracing::info!(
                "Updating {} record {}: {} -> {}",
                p.record_type,
                p.fqdn(),
                record.data,
                p.data
            );
            // Still reported as existing when the update fails
            if let Err(e) = self.update_data(p, record.id).await {
                tracing::warn!("Failed to update {} record {}: {}", p.record_type, p.fqdn(), e);
            }
        }

        Ok(true)
    }

    async fn create(&self, properties: &ResourceProperties) -> Result<ResourceData> {
        let p = record_properties(properties)?;

        let request = CreateRecordRequest {
            record_type: p.record_type,
            name: &p.name,
            data: &p.data,
        };
        let created: DomainRecordEnvelope = self
            .client
            .post(&["domains", p.domain.as_str(), "records"], &request)
            .await?;

        tracing::info!(
            "Created {} record {} (id {})",
            p.record_type,
            p.fqdn(),
            created.domain_record.id
        );
        Ok(ResourceData::DnsRecord(
            created.domain_record.into_data(&p.domain, p.record_type),
        ))
    }

    async fn delete(&self, data: &ResourceData, context: &DeleteContext) -> Result<DeleteOutcome> {
        let ResourceData::DnsRecord(record) = data else {
            return Err(Error::invalid_input(format!(
                "DNS record provider cannot delete {}",
                data.kind()
            )));
        };

        if context.cascades(data) {
            return Ok(DeleteOutcome::Skipped {
                reason: format!("domain {} is deleted in the same run", record.domain_name),
            });
        }

        let id = record.id.to_string();
        self.client
            .delete(&["domains", record.domain_name.as_str(), "records", id.as_str()])
            .await?;

        tracing::info!("Deleted DNS record {}", record.id);
        Ok(DeleteOutcome::Deleted)
    }
}
