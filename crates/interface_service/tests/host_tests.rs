//! Tests for engine bootstrap and the monitor task

use std::time::Duration;

use tokio::sync::watch;

use domain_routing::{EngineKind, PipelineState};
use interface_service::{build_service, EngineMonitor, RoutingConfig};
use test_utils::{ClaimFixtures, RuleFixtures, ScoreFixtures};

fn config_with_file(path: &std::path::Path) -> RoutingConfig {
    RoutingConfig {
        rules_file: Some(path.to_path_buf()),
        health_interval_secs: 0,
        ..RoutingConfig::default()
    }
}

#[tokio::test]
async fn test_file_store_is_seeded_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routing_rules.json");
    let config = config_with_file(&path);

    let service = build_service(&config).await.unwrap();
    assert_eq!(service.mode(), PipelineState::Running);
    assert_eq!(service.list_rules().await.len(), 10);
    assert_eq!(service.store().current_version().await, 10);
    service.shutdown().await;
    assert!(path.exists());

    // Reopening keeps the saved rules and does not seed again.
    let reopened = build_service(&config).await.unwrap();
    assert_eq!(reopened.list_rules().await.len(), 10);
    assert_eq!(reopened.store().current_version().await, 10);
    reopened.shutdown().await;
}

#[tokio::test]
async fn test_unseeded_fallback_uses_configured_defaults() {
    let config = RoutingConfig {
        engine: EngineKind::Fallback,
        seed_default_rules: false,
        default_team: "Intake".to_string(),
        default_adjuster: "Triage Desk".to_string(),
        ..RoutingConfig::default()
    };

    let service = build_service(&config).await.unwrap();
    assert_eq!(service.mode(), PipelineState::Degraded);
    assert!(service.list_rules().await.is_empty());

    let routed = service
        .apply_routing(&ScoreFixtures::suspicious_accident())
        .await
        .unwrap();
    assert_eq!(routed.decision.routing_team, "Intake");
    assert_eq!(routed.decision.adjuster, "Triage Desk");
}

#[tokio::test]
async fn test_configured_event_buffer_reaches_store() {
    let in_memory = RoutingConfig {
        event_buffer: 4,
        seed_default_rules: false,
        ..RoutingConfig::default()
    };
    let service = build_service(&in_memory).await.unwrap();
    assert_eq!(service.store().event_buffer(), 4);
    service.shutdown().await;

    let dir = tempfile::tempdir().unwrap();
    let on_disk = RoutingConfig {
        event_buffer: 8,
        ..config_with_file(&dir.path().join("routing_rules.json"))
    };
    let service = build_service(&on_disk).await.unwrap();
    assert_eq!(service.store().event_buffer(), 8);
    service.shutdown().await;
}

#[tokio::test]
async fn test_monitor_counts_reroutes_until_stopped() {
    let config = RoutingConfig {
        seed_default_rules: false,
        health_interval_secs: 0,
        ..RoutingConfig::default()
    };
    let service = build_service(&config).await.unwrap();

    let (stop_tx, stop_rx) = watch::channel(false);
    let monitor = tokio::spawn(EngineMonitor::new(service.clone(), None).run(stop_rx));
    // Let the monitor subscribe before anything is rerouted.
    tokio::time::sleep(Duration::from_millis(20)).await;

    for n in 0..3 {
        service
            .route_claim(&ClaimFixtures::claim_id(n), ScoreFixtures::suspicious_accident())
            .await
            .unwrap();
    }
    service.create_rule(RuleFixtures::siu_threshold(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    stop_tx.send_replace(true);
    let summary = monitor.await.unwrap();
    assert_eq!(summary.reroutes, 3);
    assert_eq!(summary.missed_reroutes, 0);
    assert_eq!(summary.health_checks, 0);
    service.shutdown().await;
}

#[tokio::test]
async fn test_monitor_checks_health_on_interval() {
    let service = build_service(&RoutingConfig::default()).await.unwrap();

    let (stop_tx, stop_rx) = watch::channel(false);
    let monitor = EngineMonitor::new(service.clone(), Some(Duration::from_millis(10)));
    let handle = tokio::spawn(monitor.run(stop_rx));
    tokio::time::sleep(Duration::from_millis(55)).await;

    drop(stop_tx);
    let summary = handle.await.unwrap();
    assert!(summary.health_checks >= 2, "only {} checks", summary.health_checks);
    service.shutdown().await;
}
