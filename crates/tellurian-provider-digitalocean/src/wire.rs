//! Request and response bodies of the DigitalOcean API v2
//!
//! Only the fields the providers read are modelled; everything else in the
//! responses is ignored.

use serde::{Deserialize, Serialize};
use tellurian_core::resource::{
    DnsRecordData, DnsRecordType, DropletData, DropletProperties, SshKeyRef,
};
use tellurian_core::tracker::OperationStatus;

/// Error body returned with non-success statuses
#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub id: Option<String>,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Domains
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CreateDomainRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct DomainEnvelope {
    pub domain: Domain,
}

#[derive(Debug, Deserialize)]
pub struct Domain {
    pub name: String,
    #[serde(default)]
    pub ttl: Option<u32>,
}

// ---------------------------------------------------------------------------
// Domain records
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CreateRecordRequest<'a> {
    #[serde(rename = "type")]
    pub record_type: DnsRecordType,
    pub name: &'a str,
    pub data: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UpdateRecordRequest<'a> {
    pub data: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct DomainRecordEnvelope {
    pub domain_record: DomainRecord,
}

#[derive(Debug, Deserialize)]
pub struct DomainRecordsEnvelope {
    #[serde(default)]
    pub domain_records: Vec<DomainRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DomainRecord {
    pub id: u64,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub data: String,
    #[serde(default)]
    pub ttl: Option<u32>,
}

impl DomainRecord {
    /// Data to record in the state file
    ///
    /// The record type is the one that was asked for, since the lookup and
    /// the create are both scoped by type.
    pub fn into_data(self, domain_name: &str, record_type: DnsRecordType) -> DnsRecordData {
        DnsRecordData {
            id: self.id,
            domain_name: domain_name.to_string(),
            record_type,
            name: self.name,
            data: self.data,
            ttl: self.ttl,
        }
    }
}

// ---------------------------------------------------------------------------
// Droplets
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CreateDropletRequest<'a> {
    pub name: &'a str,
    pub region: &'a str,
    pub size: &'a str,
    pub image: &'a str,
    pub ssh_keys: &'a [SshKeyRef],
    pub backups: bool,
    pub ipv6: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_uuid: Option<&'a str>,
    pub monitoring: bool,
    pub volumes: &'a [String],
    pub tags: &'a [String],
}

impl<'a> From<&'a DropletProperties> for CreateDropletRequest<'a> {
    fn from(p: &'a DropletProperties) -> Self {
        Self {
            name: &p.name,
            region: &p.region,
            size: &p.size,
            image: &p.image,
            ssh_keys: &p.ssh_keys,
            backups: p.backups,
            ipv6: p.ipv6,
            user_data: p.user_data.as_deref(),
            vpc_uuid: p.vpc_uuid.as_deref(),
            monitoring: p.monitoring,
            volumes: &p.volumes,
            tags: &p.tags,
        }
    }
}

/// Answer to `POST /droplets` (202 Accepted)
#[derive(Debug, Deserialize)]
pub struct CreateDropletResponse {
    pub droplet: Droplet,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub actions: Vec<ActionLink>,
}

#[derive(Debug, Deserialize)]
pub struct ActionLink {
    pub id: u64,
    #[serde(default)]
    pub rel: String,
    #[serde(default)]
    pub href: String,
}

#[derive(Debug, Deserialize)]
pub struct DropletEnvelope {
    pub droplet: Droplet,
}

#[derive(Debug, Deserialize)]
pub struct DropletsEnvelope {
    #[serde(default)]
    pub droplets: Vec<Droplet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Droplet {
    pub id: u64,
    pub name: String,
    pub region: Slugged,
    pub size_slug: String,
    pub image: Image,
    #[serde(default)]
    pub networks: Networks,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Slugged {
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub id: u64,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Networks {
    #[serde(default)]
    pub v4: Vec<Network>,
    #[serde(default)]
    pub v6: Vec<Network>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Network {
    pub ip_address: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Droplet {
    /// Image slug, or the numeric id for snapshots and custom images
    pub fn image_ref(&self) -> String {
        self.image
            .slug
            .clone()
            .unwrap_or_else(|| self.image.id.to_string())
    }

    /// First public IPv4 address
    pub fn public_ipv4(&self) -> Option<&str> {
        self.networks
            .v4
            .iter()
            .find(|n| n.kind == "public")
            .map(|n| n.ip_address.as_str())
    }

    pub fn has_ipv6(&self) -> bool {
        !self.networks.v6.is_empty()
    }

    /// Data to record in the state file
    pub fn into_data(self) -> DropletData {
        DropletData {
            id: self.id,
            image: self.image_ref(),
            public_ipv4: self.public_ipv4().map(str::to_string),
            ipv6_enabled: self.has_ipv6(),
            name: self.name,
            region: self.region.slug,
            size: self.size_slug,
            tags: self.tags,
        }
    }
}

/// In-place droplet change, sent to `POST /droplets/{id}/actions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DropletActionRequest {
    Rebuild { image: String },
    Resize { size: String },
    EnableIpv6,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ActionEnvelope {
    pub action: Action,
}

#[derive(Debug, Deserialize)]
pub struct Action {
    pub id: u64,
    pub status: String,
    #[serde(default)]
    pub resource_id: Option<u64>,
    #[serde(default, rename = "type")]
    pub action_type: String,
}

impl Action {
    /// Tracker status for this action
    pub fn operation_status(&self) -> OperationStatus {
        match (self.status.as_str(), self.resource_id) {
            ("completed", Some(resource_id)) => OperationStatus::Completed { resource_id },
            ("completed", None) => OperationStatus::Errored {
                reason: format!("action {} completed without a resource", self.id),
            },
            ("errored", _) => OperationStatus::Errored {
                reason: format!("{} action {} errored", self.action_type, self.id),
            },
            _ => OperationStatus::InProgress,
        }
    }
}
