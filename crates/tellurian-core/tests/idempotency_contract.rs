//! Contract Test: Idempotent Reconciliation
//!
//! This test verifies that applying the same declaration twice without
//! drift changes nothing.
//!
//! Constraints verified:
//! - The second pass skips every action and creates nothing
//! - The state file is identical after both passes
//! - The state file is written exactly once per pass
//! - Droplets are only recognised when the state file tracks them
//!
//! If this test fails, repeated runs would duplicate infrastructure.

mod common;

use common::*;
use std::sync::Arc;
use tellurian_core::config::EngineConfig;
use tellurian_core::engine::{ActionOutcome, EngineEvent};
use tellurian_core::traits::StateStore;
use tellurian_core::{FileStateStore, MemoryStateStore, Reconciler, ResourceKind};

fn full_declaration() -> tellurian_core::Declaration {
    declaration(vec![
        domain_action("main-domain", "example.com"),
        record_action("www", "example.com", "www", "203.0.113.10"),
        droplet_action("web", "web-1", "nyc3"),
    ])
}

#[tokio::test]
async fn second_pass_skips_everything() {
    let cloud = FakeCloud::new();
    let store = MemoryStateStore::new();
    let (reconciler, _events) = Reconciler::new(
        cloud.registry(),
        Arc::new(store.clone()),
        &EngineConfig::default(),
    )
    .expect("reconciler construction succeeds");

    let decl = full_declaration();

    let first = reconciler.apply(&decl).await.unwrap();
    assert_eq!(first.created(), 3);
    let state_after_first = store.snapshot().await;

    cloud.clear_calls();
    let second = reconciler.apply(&decl).await.unwrap();

    assert_eq!(second.skipped(), 3, "every action should be skipped");
    assert!(cloud.create_calls().is_empty());
    assert!(cloud.delete_calls().is_empty());
    assert_eq!(store.snapshot().await, state_after_first);
    assert_eq!(store.save_count(), 2, "one save per pass");
}

#[tokio::test]
async fn file_state_is_byte_identical_across_passes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tellurian.tlstate");
    let cloud = FakeCloud::new();
    let (reconciler, _events) = Reconciler::new(
        cloud.registry(),
        Arc::new(FileStateStore::new(&path)),
        &EngineConfig::default(),
    )
    .unwrap();

    let decl = full_declaration();

    reconciler.apply(&decl).await.unwrap();
    let first = tokio::fs::read(&path).await.unwrap();

    reconciler.apply(&decl).await.unwrap();
    let second = tokio::fs::read(&path).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(FileStateStore::new(&path).load().await.len(), 3);
}

#[tokio::test]
async fn skipped_actions_are_reported_as_events() {
    let cloud = FakeCloud::new();
    let (reconciler, mut events) = Reconciler::new(
        cloud.registry(),
        Arc::new(MemoryStateStore::new()),
        &EngineConfig::default(),
    )
    .unwrap();

    let decl = declaration(vec![domain_action("main-domain", "example.com")]);
    reconciler.apply(&decl).await.unwrap();
    reconciler.apply(&decl).await.unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }

    assert!(received.contains(&EngineEvent::ActionSkipped {
        identifier: "main-domain".to_string(),
        kind: ResourceKind::Domain,
    }));
    assert_eq!(
        received
            .iter()
            .filter(|e| matches!(e, EngineEvent::StateSaved { .. }))
            .count(),
        2
    );
}

#[tokio::test]
async fn untracked_droplet_with_same_name_is_not_adopted() {
    // A droplet created outside this tool, with the declared name
    let cloud = FakeCloud::new();
    cloud.seed(tellurian_core::ResourceData::Droplet(
        tellurian_core::resource::DropletData {
            id: 0,
            name: "web-1".to_string(),
            region: "nyc3".to_string(),
            size: "s-1vcpu-1gb".to_string(),
            image: "ubuntu-24-04-x64".to_string(),
            public_ipv4: None,
            ipv6_enabled: false,
            tags: Vec::new(),
        },
    ));

    let store = MemoryStateStore::new();
    let (reconciler, _events) = Reconciler::new(
        cloud.registry(),
        Arc::new(store.clone()),
        &EngineConfig::default(),
    )
    .unwrap();

    let report = reconciler
        .apply(&declaration(vec![droplet_action("web", "web-1", "nyc3")]))
        .await
        .unwrap();

    assert_eq!(report.outcome("web"), Some(&ActionOutcome::Created));
    assert_eq!(cloud.resources_of(ResourceKind::Droplet).len(), 2);
    assert_eq!(store.snapshot().await.tracked_droplet_ids().len(), 1);
}

#[tokio::test]
async fn lost_state_recreates_droplets_but_not_domains() {
    let cloud = FakeCloud::new();
    let store = MemoryStateStore::new();
    let (reconciler, _events) = Reconciler::new(
        cloud.registry(),
        Arc::new(store.clone()),
        &EngineConfig::default(),
    )
    .unwrap();

    let decl = declaration(vec![
        domain_action("main-domain", "example.com"),
        droplet_action("web", "web-1", "nyc3"),
    ]);
    reconciler.apply(&decl).await.unwrap();

    // Forget everything we created
    store.clear().await.unwrap();
    cloud.clear_calls();

    let report = reconciler.apply(&decl).await.unwrap();

    assert_eq!(report.outcome("main-domain"), Some(&ActionOutcome::Skipped));
    assert_eq!(report.outcome("web"), Some(&ActionOutcome::Created));
    assert_eq!(cloud.create_calls().len(), 1);
}
