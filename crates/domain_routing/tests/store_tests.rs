//! Tests for the rule store
//!
//! Covers CRUD validation, version accounting, concurrent writers and
//! persistence through the JSON file adapter.

use std::sync::Arc;

use proptest::prelude::*;

use domain_routing::{
    Condition, JsonFileRulePersistence, LegacyRuleSpec, RoutingError, RulePatch, RuleSpec,
    RuleStore, ThresholdOperator,
};
use test_utils::{rule_spec_strategy, RuleFixtures, TestRuleSpecBuilder};

// ============================================================================
// CRUD
// ============================================================================

mod crud {
    use super::*;

    #[tokio::test]
    async fn test_create_rejects_missing_condition() {
        let store = RuleStore::in_memory();
        let mut spec = RuleFixtures::siu_threshold(1);
        spec.condition = None;

        let err = store.create(spec).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.current_version().await, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_threshold_outside_unit_range() {
        let store = RuleStore::in_memory();
        let spec = RuleSpec::new(
            Condition::fraud_threshold(ThresholdOperator::Gt, 1.2),
            "SIU",
            "Investigator",
        );
        assert!(store.create(spec).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_create_rejects_overlong_name() {
        let store = RuleStore::in_memory();
        let spec = RuleFixtures::siu_threshold(1).named("x".repeat(201));
        assert!(store.create(spec).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_priority_then_creation() {
        let store = RuleStore::in_memory();
        store.create(RuleFixtures::claim_type("health", "C", 9)).await.unwrap();
        store.create(RuleFixtures::claim_type("health", "A", 1)).await.unwrap();
        store.create(RuleFixtures::claim_type("health", "B", 1)).await.unwrap();

        let teams: Vec<String> = store.list().await.into_iter().map(|r| r.routing_team).collect();
        assert_eq!(teams, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_update_unknown_rule_is_not_found() {
        let store = RuleStore::in_memory();
        let stray = store.create(RuleFixtures::siu_threshold(1)).await.unwrap();
        store.delete(stray.id).await.unwrap();

        let err = store.update(stray.id, RulePatch::enabled(false)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_second_delete_is_not_found() {
        let store = RuleStore::in_memory();
        let rule = store.create(RuleFixtures::siu_threshold(1)).await.unwrap();

        store.delete(rule.id).await.unwrap();
        let err = store.delete(rule.id).await.unwrap_err();
        assert!(matches!(err, RoutingError::NotFound { entity: "Rule", .. }));
        assert_eq!(store.current_version().await, 2);
    }

    #[tokio::test]
    async fn test_get_returns_stored_rule() {
        let store = RuleStore::in_memory();
        let rule = store.create(RuleFixtures::complexity_high(4)).await.unwrap();
        assert_eq!(store.get(rule.id).await.unwrap(), rule);
    }

    #[tokio::test]
    async fn test_legacy_spec_creates_typed_rule() {
        let store = RuleStore::in_memory();
        let legacy: LegacyRuleSpec = serde_json::from_str(
            r#"{
                "name": "High Severity - Vehicle",
                "condition_type": "severity",
                "condition_value": "high",
                "claim_type": "accident",
                "routing_team": "Complex Claims",
                "adjuster": "Senior Adjuster",
                "priority": 10
            }"#,
        )
        .unwrap();

        let rule = store.create(RuleSpec::try_from(legacy).unwrap()).await.unwrap();
        assert_eq!(rule.priority, 10);
        assert!(matches!(rule.condition, Condition::Combined { ref conditions } if conditions.len() == 2));
    }
}

// ============================================================================
// Versioning
// ============================================================================

mod versioning {
    use super::*;

    #[tokio::test]
    async fn test_no_op_update_keeps_version_and_timestamp() {
        let store = RuleStore::in_memory();
        let rule = store.create(RuleFixtures::siu_threshold(1)).await.unwrap();
        let mut changes = store.subscribe().unwrap();

        let patch = RulePatch {
            priority: Some(1),
            enabled: Some(true),
            routing_team: Some("SIU".to_string()),
            ..Default::default()
        };
        let unchanged = store.update(rule.id, patch).await.unwrap();

        assert_eq!(store.current_version().await, 1);
        assert_eq!(unchanged.updated_at, rule.updated_at);
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_update_trims_destination_like_create() {
        let store = RuleStore::in_memory();
        let rule = store.create(RuleFixtures::siu_threshold(1)).await.unwrap();

        let unchanged = store
            .update(rule.id, RulePatch::destination(" SIU ", rule.adjuster.clone() + " "))
            .await
            .unwrap();
        assert_eq!(unchanged, rule);
        assert_eq!(store.current_version().await, 1);

        let moved = store
            .update(rule.id, RulePatch::destination("  Litigation", "Counsel  "))
            .await
            .unwrap();
        assert_eq!(moved.routing_team, "Litigation");
        assert_eq!(moved.adjuster, "Counsel");
    }

    #[tokio::test]
    async fn test_real_update_bumps_timestamp() {
        let store = RuleStore::in_memory();
        let rule = store.create(RuleFixtures::siu_threshold(1)).await.unwrap();

        let updated = store
            .update(rule.id, RulePatch::destination("Litigation", "Counsel"))
            .await
            .unwrap();
        assert_eq!(store.current_version().await, 2);
        assert!(updated.updated_at >= rule.updated_at);
        assert_eq!(updated.created_at, rule.created_at);
        assert_eq!(updated.routing_team, "Litigation");
    }

    #[tokio::test]
    async fn test_concurrent_writers_never_skip_versions() {
        let store = Arc::new(RuleStore::in_memory());
        let mut changes = store.subscribe().unwrap();

        let mut handles = Vec::new();
        for n in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create(RuleFixtures::claim_type("accident", &format!("T{}", n), n))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.current_version().await, 16);
        let versions: Vec<u64> = (0..16).map(|_| changes.try_recv().unwrap().version).collect();
        assert_eq!(versions, (1..=16).collect::<Vec<u64>>());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn mutations_increment_version_by_one(
            specs in prop::collection::vec(rule_spec_strategy(), 1..10),
            toggles in prop::collection::vec(any::<bool>(), 1..10),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                let store = RuleStore::in_memory();
                let mut expected = 0u64;
                let mut ids = Vec::new();

                for spec in specs {
                    ids.push(store.create(spec).await.unwrap().id);
                    expected += 1;
                    assert_eq!(store.current_version().await, expected);
                }
                for (id, enabled) in ids.iter().zip(toggles) {
                    let before = store.get(*id).await.unwrap().enabled;
                    store.update(*id, RulePatch::enabled(enabled)).await.unwrap();
                    if before != enabled {
                        expected += 1;
                    }
                    assert_eq!(store.current_version().await, expected);
                }
                store.delete(ids[0]).await.unwrap();
                assert_eq!(store.current_version().await, expected + 1);
            });
        }
    }
}

// ============================================================================
// Persistence
// ============================================================================

mod persistence {
    use super::*;

    #[tokio::test]
    async fn test_reopen_restores_rules_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routing_rules.json");

        let first = {
            let store = RuleStore::open(Arc::new(JsonFileRulePersistence::new(&path)), 16)
                .await
                .unwrap();
            let a = store.create(RuleFixtures::siu_threshold(1)).await.unwrap();
            store
                .create(TestRuleSpecBuilder::new(Condition::claim_type("health")).build())
                .await
                .unwrap();
            store.update(a.id, RulePatch::enabled(false)).await.unwrap();
            a
        };

        let reopened = RuleStore::open(Arc::new(JsonFileRulePersistence::new(&path)), 16)
            .await
            .unwrap();
        assert_eq!(reopened.current_version().await, 3);
        assert_eq!(reopened.list().await.len(), 2);
        assert!(!reopened.get(first.id).await.unwrap().enabled);

        // New rules continue the creation order.
        let next = reopened.create(RuleFixtures::siu_threshold(0)).await.unwrap();
        assert_eq!(next.sequence, 2);
        assert_eq!(reopened.current_version().await, 4);
    }

    #[tokio::test]
    async fn test_open_on_corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routing_rules.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let result = RuleStore::open(Arc::new(JsonFileRulePersistence::new(&path)), 16).await;
        assert!(matches!(result, Err(RoutingError::Persistence(_))));
    }
}
