//! Test doubles and common utilities for contract tests
//!
//! [`FakeCloud`] is an in-memory stand-in for the provider API. One
//! [`FakeProvider`] per resource kind is registered, all sharing the same
//! cloud, so tests can observe every call and every remote resource.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tellurian_core::error::{Error, Result};
use tellurian_core::resource::{
    DnsRecordData, DnsRecordProperties, DnsRecordType, DomainData, DomainProperties,
    DropletData, DropletProperties,
};
use tellurian_core::traits::{DeleteContext, DeleteOutcome, ResourceProvider, StateFile};
use tellurian_core::{
    Declaration, DesiredAction, ProviderRegistry, ResourceData, ResourceKind, ResourceProperties,
};

/// A provider call, as seen by the fake cloud
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Check { kind: ResourceKind, key: String },
    Create { kind: ResourceKind, key: String },
    Update { kind: ResourceKind, key: String },
    Delete { kind: ResourceKind, key: String },
}

impl Call {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Call::Check { kind, .. }
            | Call::Create { kind, .. }
            | Call::Update { kind, .. }
            | Call::Delete { kind, .. } => *kind,
        }
    }
}

#[derive(Debug, Default)]
struct CloudState {
    resources: Vec<ResourceData>,
    next_id: u64,
    calls: Vec<Call>,
    failing_checks: HashSet<String>,
    failing_creates: HashSet<String>,
    failing_deletes: HashSet<String>,
}

/// Shared in-memory provider backend
///
/// Clones share the same resources and call log.
#[derive(Debug, Clone, Default)]
pub struct FakeCloud {
    inner: Arc<Mutex<CloudState>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with one fake provider per kind
    pub fn registry(&self) -> Arc<ProviderRegistry> {
        let mut registry = ProviderRegistry::new();
        for kind in ResourceKind::ALL {
            registry.register(Arc::new(FakeProvider::new(kind, self.clone())));
        }
        Arc::new(registry)
    }

    /// Make `exists_and_current` fail for the given key
    pub fn fail_check(&self, key: &str) {
        self.lock().failing_checks.insert(key.to_string());
    }

    /// Make `create` fail for the given key
    pub fn fail_create(&self, key: &str) {
        self.lock().failing_creates.insert(key.to_string());
    }

    /// Make `delete` fail for the given key
    pub fn fail_delete(&self, key: &str) {
        self.lock().failing_deletes.insert(key.to_string());
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn create_calls(&self) -> Vec<Call> {
        self.filter_calls(|c| matches!(c, Call::Create { .. }))
    }

    pub fn delete_calls(&self) -> Vec<Call> {
        self.filter_calls(|c| matches!(c, Call::Delete { .. }))
    }

    pub fn update_calls(&self) -> Vec<Call> {
        self.filter_calls(|c| matches!(c, Call::Update { .. }))
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Remote resources currently present
    pub fn resources(&self) -> Vec<ResourceData> {
        self.lock().resources.clone()
    }

    /// Remote resources of one kind
    pub fn resources_of(&self, kind: ResourceKind) -> Vec<ResourceData> {
        self.resources()
            .into_iter()
            .filter(|r| r.kind() == kind)
            .collect()
    }

    /// Put a resource in the cloud without going through the reconciler
    pub fn seed(&self, mut data: ResourceData) -> ResourceData {
        let mut state = self.lock();
        state.next_id += 1;
        let id = 1000 + state.next_id;
        match &mut data {
            ResourceData::DnsRecord(d) => d.id = id,
            ResourceData::Droplet(d) => d.id = id,
            ResourceData::Domain(_) => {}
        }
        state.resources.push(data.clone());
        data
    }

    fn filter_calls(&self, predicate: impl Fn(&Call) -> bool) -> Vec<Call> {
        self.lock().calls.iter().filter(|c| predicate(c)).cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CloudState> {
        self.inner.lock().unwrap()
    }
}

/// Identity key of desired properties
pub fn properties_key(properties: &ResourceProperties) -> String {
    match properties {
        ResourceProperties::Domain(p) => p.name.clone(),
        ResourceProperties::DnsRecord(p) => p.fqdn(),
        ResourceProperties::Droplet(p) => p.name.clone(),
    }
}

/// Identity key of recorded data
pub fn data_key(data: &ResourceData) -> String {
    match data {
        ResourceData::Domain(d) => d.name.clone(),
        ResourceData::DnsRecord(d) if d.name == "@" => d.domain_name.clone(),
        ResourceData::DnsRecord(d) => format!("{}.{}", d.name, d.domain_name),
        ResourceData::Droplet(d) => d.name.clone(),
    }
}

/// Fake provider for one kind, backed by a shared [`FakeCloud`]
///
/// Mirrors the matching rules of the real providers: domains match by name,
/// DNS records by (domain, type, name) with in-place data updates, droplets
/// by name among the ids the state file tracks, with region changes forcing
/// a new droplet.
pub struct FakeProvider {
    kind: ResourceKind,
    cloud: FakeCloud,
}

impl FakeProvider {
    pub fn new(kind: ResourceKind, cloud: FakeCloud) -> Self {
        Self { kind, cloud }
    }
}

#[async_trait]
impl ResourceProvider for FakeProvider {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn exists_and_current(
        &self,
        properties: &ResourceProperties,
        state: &StateFile,
    ) -> Result<bool> {
        let key = properties_key(properties);
        let mut guard = self.cloud.lock();
        let cloud = &mut *guard;
        cloud.calls.push(Call::Check {
            kind: self.kind,
            key: key.clone(),
        });

        if cloud.failing_checks.contains(&key) {
            return Err(Error::provider_request("fake", 503, "check unavailable"));
        }

        match properties {
            ResourceProperties::Domain(p) => Ok(cloud
                .resources
                .iter()
                .any(|r| matches!(r, ResourceData::Domain(d) if d.name == p.name))),
            ResourceProperties::DnsRecord(p) => {
                let existing = cloud.resources.iter_mut().find_map(|r| match r {
                    ResourceData::DnsRecord(d)
                        if d.domain_name == p.domain
                            && d.record_type == p.record_type
                            && d.name == p.name =>
                    {
                        Some(d)
                    }
                    _ => None,
                });
                let Some(existing) = existing else {
                    return Ok(false);
                };
                if existing.data != p.data {
                    existing.data = p.data.clone();
                    cloud.calls.push(Call::Update {
                        kind: self.kind,
                        key,
                    });
                }
                Ok(true)
            }
            ResourceProperties::Droplet(p) => {
                let tracked = state.tracked_droplet_ids();
                let existing = cloud.resources.iter().find_map(|r| match r {
                    ResourceData::Droplet(d) if d.name == p.name && tracked.contains(&d.id) => {
                        Some(d)
                    }
                    _ => None,
                });
                Ok(existing.is_some_and(|d| d.region == p.region))
            }
        }
    }

    async fn create(&self, properties: &ResourceProperties) -> Result<ResourceData> {
        let key = properties_key(properties);
        let mut cloud = self.cloud.lock();
        cloud.calls.push(Call::Create {
            kind: self.kind,
            key: key.clone(),
        });

        if cloud.failing_creates.contains(&key) {
            return Err(Error::provider_request(
                "fake",
                422,
                format!("cannot create {}", key),
            ));
        }

        cloud.next_id += 1;
        let id = cloud.next_id;
        let data = match properties {
            ResourceProperties::Domain(p) => ResourceData::Domain(DomainData {
                name: p.name.clone(),
                ttl: Some(1800),
            }),
            ResourceProperties::DnsRecord(p) => ResourceData::DnsRecord(DnsRecordData {
                id,
                domain_name: p.domain.clone(),
                record_type: p.record_type,
                name: p.name.clone(),
                data: p.data.clone(),
                ttl: Some(1800),
            }),
            ResourceProperties::Droplet(p) => ResourceData::Droplet(DropletData {
                id,
                name: p.name.clone(),
                region: p.region.clone(),
                size: p.size.clone(),
                image: p.image.clone(),
                public_ipv4: Some(format!("203.0.113.{}", id)),
                ipv6_enabled: p.ipv6,
                tags: p.tags.clone(),
            }),
        };

        cloud.resources.push(data.clone());
        Ok(data)
    }

    async fn delete(&self, data: &ResourceData, context: &DeleteContext) -> Result<DeleteOutcome> {
        let key = data_key(data);
        let mut cloud = self.cloud.lock();
        cloud.calls.push(Call::Delete {
            kind: self.kind,
            key: key.clone(),
        });

        if context.cascades(data) {
            return Ok(DeleteOutcome::Skipped {
                reason: "parent domain deleted".to_string(),
            });
        }
        if cloud.failing_deletes.contains(&key) {
            return Err(Error::provider_request("fake", 500, "delete failed"));
        }

        let before = cloud.resources.len();
        cloud.resources.retain(|r| !same_resource(r, data));
        if cloud.resources.len() == before {
            return Err(Error::provider_request("fake", 404, "not found"));
        }

        // Deleting a domain takes its records with it
        if let ResourceData::Domain(d) = data {
            cloud
                .resources
                .retain(|r| r.parent_domain() != Some(d.name.as_str()));
        }

        Ok(DeleteOutcome::Deleted)
    }
}

/// Whether two records describe the same remote resource
fn same_resource(a: &ResourceData, b: &ResourceData) -> bool {
    match (a, b) {
        (ResourceData::Domain(a), ResourceData::Domain(b)) => a.name == b.name,
        (ResourceData::DnsRecord(a), ResourceData::DnsRecord(b)) => a.id == b.id,
        (ResourceData::Droplet(a), ResourceData::Droplet(b)) => a.id == b.id,
        _ => false,
    }
}

pub fn domain_action(identifier: &str, name: &str) -> DesiredAction {
    DesiredAction::new(
        identifier,
        ResourceProperties::Domain(DomainProperties {
            name: name.to_string(),
            ip_address: None,
        }),
    )
}

pub fn record_action(identifier: &str, domain: &str, name: &str, data: &str) -> DesiredAction {
    DesiredAction::new(
        identifier,
        ResourceProperties::DnsRecord(DnsRecordProperties {
            domain: domain.to_string(),
            record_type: DnsRecordType::A,
            name: name.to_string(),
            data: data.to_string(),
        }),
    )
}

pub fn droplet_properties(name: &str, region: &str) -> DropletProperties {
    DropletProperties {
        name: name.to_string(),
        region: region.to_string(),
        size: "s-1vcpu-1gb".to_string(),
        image: "ubuntu-24-04-x64".to_string(),
        ssh_keys: Vec::new(),
        backups: false,
        ipv6: false,
        user_data: None,
        vpc_uuid: None,
        monitoring: false,
        volumes: Vec::new(),
        tags: Vec::new(),
    }
}

pub fn droplet_action(identifier: &str, name: &str, region: &str) -> DesiredAction {
    DesiredAction::new(
        identifier,
        ResourceProperties::Droplet(droplet_properties(name, region)),
    )
}

pub fn declaration(actions: Vec<DesiredAction>) -> Declaration {
    Declaration::new(actions).unwrap()
}
