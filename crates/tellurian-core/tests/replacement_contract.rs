//! Contract Test: Replacement & Drift
//!
//! This test verifies what happens when a declared resource exists but no
//! longer matches the declaration.
//!
//! Constraints verified:
//! - A re-created identifier deletes the resource it supersedes
//! - Exactly one record per identifier survives
//! - In-place drift (DNS record data) is corrected without a re-create
//! - Duplicate records left by older state files are all superseded
//!
//! If this test fails, replaced infrastructure would leak.

mod common;

use common::*;
use std::sync::Arc;
use tellurian_core::config::EngineConfig;
use tellurian_core::engine::ActionOutcome;
use tellurian_core::traits::{StateFile, StateRecord};
use tellurian_core::{MemoryStateStore, Reconciler, ResourceData, ResourceKind};

fn reconciler(cloud: &FakeCloud, store: &MemoryStateStore) -> Reconciler {
    let (reconciler, _events) = Reconciler::new(
        cloud.registry(),
        Arc::new(store.clone()),
        &EngineConfig::default(),
    )
    .expect("reconciler construction succeeds");
    reconciler
}

fn droplet_id(record: &StateRecord) -> u64 {
    match &record.data {
        ResourceData::Droplet(d) => d.id,
        other => panic!("expected droplet, got {:?}", other),
    }
}

#[tokio::test]
async fn region_change_replaces_droplet() {
    let cloud = FakeCloud::new();
    let store = MemoryStateStore::new();
    let reconciler = reconciler(&cloud, &store);

    reconciler
        .apply(&declaration(vec![droplet_action("web", "web-1", "nyc3")]))
        .await
        .unwrap();
    let old_id = droplet_id(&store.snapshot().await.records()[0]);

    let report = reconciler
        .apply(&declaration(vec![droplet_action("web", "web-1", "sfo3")]))
        .await
        .unwrap();

    assert_eq!(
        report.outcome("web"),
        Some(&ActionOutcome::Replaced { superseded: 1 })
    );

    let state = store.snapshot().await;
    let records: Vec<_> = state.find("web").collect();
    assert_eq!(records.len(), 1, "exactly one record per identifier");
    assert_ne!(droplet_id(records[0]), old_id);

    // The superseded droplet is gone from the provider
    let remaining = cloud.resources_of(ResourceKind::Droplet);
    assert_eq!(remaining.len(), 1);
    assert!(matches!(&remaining[0], ResourceData::Droplet(d) if d.region == "sfo3"));
}

#[tokio::test]
async fn dns_record_drift_is_updated_in_place() {
    let cloud = FakeCloud::new();
    let store = MemoryStateStore::new();
    let reconciler = reconciler(&cloud, &store);

    reconciler
        .apply(&declaration(vec![record_action(
            "www",
            "example.com",
            "www",
            "203.0.113.10",
        )]))
        .await
        .unwrap();
    cloud.clear_calls();

    let report = reconciler
        .apply(&declaration(vec![record_action(
            "www",
            "example.com",
            "www",
            "203.0.113.99",
        )]))
        .await
        .unwrap();

    assert_eq!(report.outcome("www"), Some(&ActionOutcome::Skipped));
    assert_eq!(cloud.update_calls().len(), 1);
    assert!(cloud.create_calls().is_empty());
    assert!(cloud.delete_calls().is_empty());
    assert!(matches!(
        &cloud.resources_of(ResourceKind::DnsRecord)[0],
        ResourceData::DnsRecord(d) if d.data == "203.0.113.99"
    ));
}

#[tokio::test]
async fn duplicate_records_are_all_superseded() {
    let cloud = FakeCloud::new();
    let first = cloud.seed(ResourceData::Droplet(tellurian_core::resource::DropletData {
        id: 0,
        name: "web-1".to_string(),
        region: "nyc3".to_string(),
        size: "s-1vcpu-1gb".to_string(),
        image: "ubuntu-24-04-x64".to_string(),
        public_ipv4: None,
        ipv6_enabled: false,
        tags: Vec::new(),
    }));
    let mut second = first.clone();
    if let ResourceData::Droplet(d) = &mut second {
        d.name = "web-1-old".to_string();
    }
    let second = cloud.seed(second);

    let store = MemoryStateStore::with_state(StateFile::from_records(vec![
        StateRecord::new("web", first),
        StateRecord::new("web", second),
    ]));
    let reconciler = reconciler(&cloud, &store);

    let report = reconciler
        .apply(&declaration(vec![droplet_action("web", "web-1", "ams3")]))
        .await
        .unwrap();

    assert_eq!(
        report.outcome("web"),
        Some(&ActionOutcome::Replaced { superseded: 2 })
    );
    assert_eq!(store.snapshot().await.find("web").count(), 1);
    assert_eq!(cloud.delete_calls().len(), 2);
    assert_eq!(cloud.resources_of(ResourceKind::Droplet).len(), 1);
}

#[tokio::test]
async fn failed_delete_of_superseded_record_still_replaces() {
    let cloud = FakeCloud::new();
    let store = MemoryStateStore::new();
    let reconciler = reconciler(&cloud, &store);

    reconciler
        .apply(&declaration(vec![droplet_action("web", "web-1", "nyc3")]))
        .await
        .unwrap();
    cloud.fail_delete("web-1");

    let report = reconciler
        .apply(&declaration(vec![droplet_action("web", "web-1", "lon1")]))
        .await
        .unwrap();

    assert_eq!(
        report.outcome("web"),
        Some(&ActionOutcome::Replaced { superseded: 1 })
    );
    assert_eq!(store.snapshot().await.find("web").count(), 1);
}
