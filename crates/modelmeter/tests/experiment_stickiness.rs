//! Sticky assignment, split boundaries, and persistence across reopen

mod common;

use common::harness;
use modelmeter_experiment::{bucket, Experiments, PromptCatalog, PromptStatus};
use modelmeter_store::SqliteKv;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn seeded_catalog<S: modelmeter_store::KvStore>(
    catalog: &mut PromptCatalog<S>,
) -> (String, String) {
    let a = catalog
        .create(
            "chatbot",
            "Answer briefly: {question}",
            vec!["question".to_string()],
            None,
            vec![],
        )
        .unwrap();
    let b = catalog
        .create(
            "chatbot",
            "Answer in detail: {question}",
            vec!["question".to_string()],
            None,
            vec![],
        )
        .unwrap();
    (a, b)
}

#[test]
fn assignment_is_sticky_for_every_user() {
    let mut h = harness();
    let (a, b) = seeded_catalog(&mut h.catalog);
    h.experiments
        .start(&mut h.catalog, "chatbot", &a, &b, 0.5)
        .unwrap();

    for i in 0..200 {
        let user = format!("user_{i}");
        let first = h
            .experiments
            .assign(&h.catalog, "chatbot", Some(&user))
            .unwrap()
            .unwrap();
        let expected = if bucket(&user) < 50 { &b } else { &a };
        assert_eq!(&first, expected);

        for _ in 0..3 {
            let again = h
                .experiments
                .assign(&h.catalog, "chatbot", Some(&user))
                .unwrap()
                .unwrap();
            assert_eq!(again, first);
        }
    }
}

#[test]
fn split_boundaries_are_exact() {
    let mut h = harness();
    let (a, b) = seeded_catalog(&mut h.catalog);

    h.experiments
        .start(&mut h.catalog, "chatbot", &a, &b, 0.0)
        .unwrap();
    for i in 0..100 {
        let variant = h
            .experiments
            .assign(&h.catalog, "chatbot", Some(&format!("user_{i}")))
            .unwrap()
            .unwrap();
        assert_eq!(variant, a);
    }

    h.experiments
        .start(&mut h.catalog, "chatbot", &a, &b, 1.0)
        .unwrap();
    for i in 0..100 {
        let variant = h
            .experiments
            .assign(&h.catalog, "chatbot", Some(&format!("user_{i}")))
            .unwrap()
            .unwrap();
        assert_eq!(variant, b);
    }
}

#[test]
fn restart_is_last_write_wins() {
    let mut h = harness();
    let (a, b) = seeded_catalog(&mut h.catalog);

    h.experiments
        .start(&mut h.catalog, "chatbot", &a, &b, 0.25)
        .unwrap();
    h.experiments
        .start(&mut h.catalog, "chatbot", &b, &a, 0.75)
        .unwrap();

    let config = h.experiments.get("chatbot").unwrap().unwrap();
    assert_eq!(config.variant_a_id, b);
    assert_eq!(config.variant_b_id, a);
    assert_eq!(config.traffic_split, 0.75);
}

#[test]
fn fallback_uses_active_variant_then_nothing() {
    let mut h = harness();
    let (a, _) = seeded_catalog(&mut h.catalog);

    assert_eq!(
        h.experiments.assign(&h.catalog, "chatbot", Some("u")).unwrap(),
        None
    );

    h.catalog.activate(&a).unwrap();
    assert_eq!(
        h.experiments.assign(&h.catalog, "chatbot", Some("u")).unwrap(),
        Some(a)
    );
}

#[test]
fn starting_marks_variants_testing() {
    let mut h = harness();
    let (a, b) = seeded_catalog(&mut h.catalog);
    h.experiments
        .start(&mut h.catalog, "chatbot", &a, &b, 0.5)
        .unwrap();

    assert_eq!(h.catalog.get(&a).unwrap().status, PromptStatus::Testing);
    assert_eq!(h.catalog.get(&b).unwrap().status, PromptStatus::Testing);
}

#[test]
fn assignment_survives_reopening_the_database() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("telemetry.db");
    let ttl = Duration::from_secs(3600);

    let (a, b, assigned_before) = {
        let kv = Arc::new(SqliteKv::open(&db_path).unwrap());
        let mut catalog = PromptCatalog::new(Arc::clone(&kv), ttl);
        let (a, b) = seeded_catalog(&mut catalog);
        let experiments = Experiments::new(kv);
        experiments
            .start(&mut catalog, "chatbot", &a, &b, 0.5)
            .unwrap();
        let assigned = experiments
            .assign(&catalog, "chatbot", Some("user_17"))
            .unwrap()
            .unwrap();
        (a, b, assigned)
    };

    let kv = Arc::new(SqliteKv::open(&db_path).unwrap());
    let catalog = PromptCatalog::load(Arc::clone(&kv), ttl).unwrap();
    let experiments = Experiments::new(kv);

    let assigned_after = experiments
        .assign(&catalog, "chatbot", Some("user_17"))
        .unwrap()
        .unwrap();
    assert_eq!(assigned_after, assigned_before);
    assert!(assigned_after == a || assigned_after == b);
}

#[test]
fn rendering_through_assigned_variant() {
    let mut h = harness();
    let (a, b) = seeded_catalog(&mut h.catalog);
    h.experiments
        .start(&mut h.catalog, "chatbot", &a, &b, 0.5)
        .unwrap();

    let variant = h
        .experiments
        .assign(&h.catalog, "chatbot", Some("user_3"))
        .unwrap()
        .unwrap();
    let vars = HashMap::from([("question".to_string(), "what is rust?".to_string())]);
    let rendered = h.catalog.render("chatbot", &vars, Some(&variant)).unwrap();
    assert!(rendered.contains("what is rust?"));
}
