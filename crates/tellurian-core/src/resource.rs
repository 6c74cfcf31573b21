//! Resource model
//!
//! Every resource kind has two typed shapes:
//!
//! - **Properties**: what the declaration asks for ([`ResourceProperties`])
//! - **Data**: what a provider reports back after creation and what the
//!   state file keeps so the resource can be found and deleted later
//!   ([`ResourceData`])
//!
//! Both are tagged unions keyed by [`ResourceKind`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Supported resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A DNS zone
    #[serde(rename = "DO_DOMAIN")]
    Domain,
    /// A record inside a DNS zone
    #[serde(rename = "DO_DNS_RECORD")]
    DnsRecord,
    /// A virtual machine
    #[serde(rename = "DO_DROPLET")]
    Droplet,
}

impl ResourceKind {
    /// All kinds, in the order teardown reasons about them
    pub const ALL: [ResourceKind; 3] = [Self::Domain, Self::DnsRecord, Self::Droplet];

    /// Name used in declaration and state files
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Domain => "DO_DOMAIN",
            Self::DnsRecord => "DO_DNS_RECORD",
            Self::Droplet => "DO_DROPLET",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.wire_name() == s)
            .ok_or_else(|| Error::invalid_input(format!("No such resource: {}", s)))
    }
}

/// DNS record types that can be managed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
    /// Canonical name record
    Cname,
}

impl DnsRecordType {
    /// Record type as the DNS API spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
        }
    }
}

impl fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Desired properties
// ---------------------------------------------------------------------------

/// Desired properties of a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainProperties {
    /// Domain name, e.g. `example.com`
    pub name: String,
    /// Optional IP address for the apex A record created with the domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// Desired properties of a DNS record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecordProperties {
    /// Parent domain name
    pub domain: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: DnsRecordType,
    /// Record name relative to the domain (`@` for the apex)
    pub name: String,
    /// Record value (address or target host)
    pub data: String,
}

impl DnsRecordProperties {
    /// Fully qualified record name
    pub fn fqdn(&self) -> String {
        if self.name == "@" {
            self.domain.clone()
        } else {
            format!("{}.{}", self.name, self.domain)
        }
    }
}

/// Reference to an SSH key, either by numeric id or by fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SshKeyRef {
    /// Numeric key id
    Id(u64),
    /// Key fingerprint
    Fingerprint(String),
}

/// Desired properties of a droplet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropletProperties {
    /// Droplet name
    pub name: String,
    /// Region slug (immutable once created)
    pub region: String,
    /// Size slug
    pub size: String,
    /// Image slug
    pub image: String,
    #[serde(default)]
    pub ssh_keys: Vec<SshKeyRef>,
    #[serde(default)]
    pub backups: bool,
    #[serde(default)]
    pub ipv6: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_uuid: Option<String>,
    #[serde(default)]
    pub monitoring: bool,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Desired properties of any resource kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceProperties {
    Domain(DomainProperties),
    DnsRecord(DnsRecordProperties),
    Droplet(DropletProperties),
}

impl ResourceProperties {
    /// Kind of resource these properties describe
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Domain(_) => ResourceKind::Domain,
            Self::DnsRecord(_) => ResourceKind::DnsRecord,
            Self::Droplet(_) => ResourceKind::Droplet,
        }
    }

    /// Check that every required field carries a value
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Domain(p) => require("name", &p.name),
            Self::DnsRecord(p) => {
                require("domain", &p.domain)?;
                require("name", &p.name)?;
                require("data", &p.data)
            }
            Self::Droplet(p) => {
                require("name", &p.name)?;
                require("region", &p.region)?;
                require("size", &p.size)?;
                require("image", &p.image)
            }
        }
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_input(format!("`{}` cannot be empty", field)));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Recorded data
// ---------------------------------------------------------------------------

/// Recorded data of a created domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

/// Recorded data of a created DNS record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecordData {
    /// Provider-assigned record id
    pub id: u64,
    /// Parent domain name
    pub domain_name: String,
    #[serde(rename = "type")]
    pub record_type: DnsRecordType,
    pub name: String,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

/// Recorded data of a created droplet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropletData {
    /// Provider-assigned droplet id
    pub id: u64,
    pub name: String,
    pub region: String,
    pub size: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ipv4: Option<String>,
    #[serde(default)]
    pub ipv6_enabled: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Recorded data of any resource kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceData {
    Domain(DomainData),
    DnsRecord(DnsRecordData),
    Droplet(DropletData),
}

impl ResourceData {
    /// Kind of resource this data belongs to
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Domain(_) => ResourceKind::Domain,
            Self::DnsRecord(_) => ResourceKind::DnsRecord,
            Self::Droplet(_) => ResourceKind::Droplet,
        }
    }

    /// Domain whose deletion also removes this resource, if any
    pub fn parent_domain(&self) -> Option<&str> {
        match self {
            Self::DnsRecord(d) => Some(&d.domain_name),
            Self::Domain(_) | Self::Droplet(_) => None,
        }
    }

    /// Short human-readable label for logs
    pub fn label(&self) -> String {
        match self {
            Self::Domain(d) => d.name.clone(),
            Self::DnsRecord(d) => format!("{} {} (id {})", d.record_type, d.name, d.id),
            Self::Droplet(d) => format!("{} (id {})", d.name, d.id),
        }
    }

    /// Decode the `data` payload of a state record of the given kind
    pub fn from_value(kind: ResourceKind, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            ResourceKind::Domain => Self::Domain(serde_json::from_value(value)?),
            ResourceKind::DnsRecord => Self::DnsRecord(serde_json::from_value(value)?),
            ResourceKind::Droplet => Self::Droplet(serde_json::from_value(value)?),
        })
    }
}

impl Serialize for ResourceData {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Domain(d) => d.serialize(serializer),
            Self::DnsRecord(d) => d.serialize(serializer),
            Self::Droplet(d) => d.serialize(serializer),
        }
    }
}
