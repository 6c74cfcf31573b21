// # State Store Trait
//
// Defines the interface for the persisted record of created resources.
//
// ## Purpose
//
// The state store remembers every resource the reconciler created so that:
// - droplets can be told apart from externally managed ones
// - a re-created identifier can clean up what it supersedes
// - teardown knows what to delete without reading the declaration
//
// ## Implementations
//
// - File-based: JSON array, atomic write-then-rename
// - In-memory: tests and embedding
//
// ## Usage
//
// ```rust,ignore
// use tellurian_core::StateStore;
//
// let state = store.load().await;          // never fails
// // ... reconcile ...
// store.save(&state).await?;               // exactly once per pass
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::resource::{ResourceData, ResourceKind};

/// One tracked resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawStateRecord")]
pub struct StateRecord {
    /// Identifier of the declared action that created the resource
    pub identifier: String,
    /// Provider-reported data needed to find or delete the resource
    pub data: ResourceData,
    /// When the reconciler recorded the resource
    pub created_at: Option<DateTime<Utc>>,
}

impl StateRecord {
    /// Create a record stamped with the current time
    pub fn new(identifier: impl Into<String>, data: ResourceData) -> Self {
        Self {
            identifier: identifier.into(),
            data,
            created_at: Some(Utc::now()),
        }
    }

    /// Kind of the tracked resource
    pub fn kind(&self) -> ResourceKind {
        self.data.kind()
    }
}

/// On-disk shape of a record, decoded before the kind-specific payload
#[derive(Debug, Deserialize)]
struct RawStateRecord {
    identifier: String,
    resource: ResourceKind,
    data: serde_json::Value,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<RawStateRecord> for StateRecord {
    type Error = serde_json::Error;

    fn try_from(raw: RawStateRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            identifier: raw.identifier,
            data: ResourceData::from_value(raw.resource, raw.data)?,
            created_at: raw.created_at,
        })
    }
}

impl Serialize for StateRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("StateRecord", 4)?;
        record.serialize_field("identifier", &self.identifier)?;
        record.serialize_field("resource", &self.kind())?;
        record.serialize_field("data", &self.data)?;
        record.serialize_field("created_at", &self.created_at)?;
        record.end()
    }
}

/// Ordered collection of tracked resources
///
/// Order is append order. It carries no meaning except that teardown walks
/// records in this order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateFile {
    records: Vec<StateRecord>,
}

impl StateFile {
    /// Create an empty state file
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing records
    pub fn from_records(records: Vec<StateRecord>) -> Self {
        Self { records }
    }

    /// Records in append order
    pub fn records(&self) -> &[StateRecord] {
        &self.records
    }

    /// Consume into records
    pub fn into_records(self) -> Vec<StateRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record
    pub fn push(&mut self, record: StateRecord) {
        self.records.push(record);
    }

    /// Records carrying the given identifier
    pub fn find(&self, identifier: &str) -> impl Iterator<Item = &StateRecord> {
        self.records.iter().filter(move |r| r.identifier == identifier)
    }

    /// Remove and return every record with the given identifier
    ///
    /// Older state files may contain the same identifier more than once; all
    /// of them are removed so exactly one survives after the caller appends
    /// the replacement.
    pub fn remove_identifier(&mut self, identifier: &str) -> Vec<StateRecord> {
        let (removed, kept) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| r.identifier == identifier);
        self.records = kept;
        removed
    }

    /// Ids of droplets this tool created
    pub fn tracked_droplet_ids(&self) -> HashSet<u64> {
        self.records
            .iter()
            .filter_map(|r| match &r.data {
                ResourceData::Droplet(d) => Some(d.id),
                _ => None,
            })
            .collect()
    }

    /// Names of domains this tool created
    pub fn domain_names(&self) -> HashSet<String> {
        self.records
            .iter()
            .filter_map(|r| match &r.data {
                ResourceData::Domain(d) => Some(d.name.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Trait for state store implementations
///
/// # Failure semantics
///
/// - `load` never fails: a missing, empty, unreadable or corrupt state is a
///   fresh start, not an error.
/// - `save` is all-or-nothing: a failed save leaves the previous state
///   intact for the next `load`.
/// - `clear` leaves an empty (zero-length) state behind.
///
/// # Concurrency
///
/// A single reconciliation process is assumed. No locking is performed.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the persisted records
    async fn load(&self) -> StateFile;

    /// Atomically replace the persisted records
    async fn save(&self, state: &StateFile) -> Result<(), crate::Error>;

    /// Replace the persisted records with an empty payload
    async fn clear(&self) -> Result<(), crate::Error>;

    /// Short name for logging
    fn store_name(&self) -> &'static str;
}
