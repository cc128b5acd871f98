//! Adapter Scenario Tests
//!
//! Drives the public adapter API end to end: queries over mixed live and
//! expired entries, counters with expiration, key-set locking and snapshots.

use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread::{self, sleep};
use std::time::Duration;

use cache_bridge::adapter::{
    Operation, Projected, Query, QueryOutcome, QuerySpec, ReturnShape, StreamOptions, Ttl,
    WritePolicy,
};
use cache_bridge::engine::{EvictionPolicy, Expr, Field};
use cache_bridge::error::{EngineError, PersistenceReason};
use cache_bridge::{CacheError, CacheHandle, Config};
use serde_json::{json, Value};

// == Helper Functions ==

fn start(name: &str) -> CacheHandle {
    CacheHandle::start(&Config {
        name: name.to_string(),
        ..Config::default()
    })
}

/// Ten entries {1→2, 2→4, …, 10→20}.
fn doubled(handle: &CacheHandle) {
    let entries: BTreeMap<String, Value> =
        (1..=10).map(|i| (i.to_string(), json!(i * 2))).collect();
    assert!(handle
        .put_all(entries, Ttl::Infinite, WritePolicy::Insert)
        .unwrap());
}

// == Query Scenarios ==

#[test]
fn test_expired_half_is_purged() {
    let handle = start("scenario-expired");
    doubled(&handle);
    assert_eq!(handle.count_all(&Query::Everything).unwrap(), 10);

    for i in 1..=5 {
        assert!(handle.expire(&i.to_string(), Ttl::from_millis(30)).unwrap());
    }
    sleep(Duration::from_millis(80));

    assert_eq!(handle.delete_all(&Query::Expired).unwrap(), 5);
    assert_eq!(handle.count_all(&Query::Everything).unwrap(), 5);
}

#[test]
fn test_predicate_composes_with_every_shape() {
    let handle = start("scenario-shapes");
    doubled(&handle);
    let query = Query::Match(QuerySpec::filter(
        Expr::field(Field::Value).ge(Expr::lit(16)),
    ));

    let keys = handle
        .all(&query, &StreamOptions::default().with_shape(ReturnShape::Key))
        .unwrap();
    assert_eq!(
        keys,
        vec![
            Projected::Key("10".to_string()),
            Projected::Key("8".to_string()),
            Projected::Key("9".to_string()),
        ]
    );

    let pairs = handle
        .all(&query, &StreamOptions::default().with_shape(ReturnShape::KeyValue))
        .unwrap();
    assert!(pairs.contains(&Projected::KeyValue("9".to_string(), json!(18))));

    let entries = handle
        .all(
            &query,
            &StreamOptions::default()
                .with_shape(ReturnShape::Entry)
                .with_page_size(1),
        )
        .unwrap();
    assert_eq!(entries.len(), 3);
    for entry in entries {
        match entry {
            Projected::Entry(entry) => assert_eq!(entry.ttl, Ttl::Infinite),
            other => panic!("expected an entry, got {:?}", other),
        }
    }
}

#[test]
fn test_expired_selector_with_extra_condition() {
    let handle = start("scenario-selector");
    doubled(&handle);
    for i in 1..=4 {
        handle.expire(&i.to_string(), Ttl::from_millis(20)).unwrap();
    }
    sleep(Duration::from_millis(60));

    let query = Query::Match(QuerySpec::filter(
        Expr::Expired.and(Expr::field(Field::Value).gt(Expr::lit(4))),
    ));
    let keys: Vec<String> = handle
        .all(&query, &StreamOptions::default())
        .unwrap()
        .iter()
        .filter_map(|p| p.key().map(str::to_string))
        .collect();

    assert_eq!(keys, vec!["3".to_string(), "4".to_string()]);
}

#[test]
fn test_invalid_stream_and_unsupported_operation() {
    let handle = start("scenario-errors");
    doubled(&handle);

    let invalid = Query::Match(QuerySpec::filter(Expr::lit(42)));
    let first = handle
        .stream(&invalid, &StreamOptions::default())
        .unwrap()
        .into_iter()
        .next();
    assert!(matches!(first, Some(Err(CacheError::Query(_)))));

    match handle.execute(Operation::CountAll, &Query::Expired, &StreamOptions::default()) {
        Err(CacheError::Query(err)) => {
            assert_eq!(err.operation, "count_all");
            assert!(err.message.contains("count_all"));
        }
        other => panic!("expected a query error, got {:?}", other),
    }
}

#[test]
fn test_execute_all_matches_all() {
    let handle = start("scenario-execute");
    doubled(&handle);
    let opts = StreamOptions::default().with_page_size(3);

    let outcome = handle
        .execute(Operation::All, &Query::Everything, &opts)
        .unwrap();
    let all = handle.all(&Query::Everything, &opts).unwrap();

    assert_eq!(outcome, QueryOutcome::Entries(all));
}

// == Counter Scenarios ==

#[test]
fn test_counter_with_ttl_expires() {
    let handle = start("scenario-counter");

    assert_eq!(
        handle
            .update_counter("visits", 3, Ttl::from_millis(50), 10)
            .unwrap(),
        13
    );
    assert!(matches!(handle.ttl("visits"), Some(Ttl::Finite(_))));

    sleep(Duration::from_millis(100));
    assert_eq!(handle.get("visits"), None);
}

#[test]
fn test_counter_waits_out_lock_then_times_out() {
    let handle = CacheHandle::start(&Config {
        lock_timeout_ms: 50,
        ..Config::default()
    });
    let engine = handle.engine().clone();
    let (locked_tx, locked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let holder = thread::spawn(move || {
        engine.transaction(&["hits".to_string()], || -> Result<(), EngineError> {
            locked_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            Ok(())
        })
    });
    locked_rx.recv().unwrap();

    let err = handle
        .update_counter("hits", 1, Ttl::from_secs(5), 0)
        .unwrap_err();
    assert!(matches!(err, CacheError::Engine(EngineError::LockTimeout(_))));

    // Infinite TTL never takes the lock
    assert_eq!(handle.update_counter("hits", 1, Ttl::Infinite, 0).unwrap(), 1);

    release_tx.send(()).unwrap();
    holder.join().unwrap().unwrap();
    assert_eq!(handle.update_counter("hits", 1, Ttl::from_secs(5), 0).unwrap(), 2);
}

// == Write Scenarios ==

#[test]
fn test_overlapping_bulk_inserts_have_one_winner() {
    let handle = start("scenario-bulk");
    let barrier = Arc::new(Barrier::new(6));

    let workers: Vec<_> = (0..6)
        .map(|worker| {
            let handle = handle.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let batch: Vec<(String, Value)> = ["a", "b", "c"]
                    .iter()
                    .map(|k| (k.to_string(), json!(worker)))
                    .collect();
                barrier.wait();
                handle
                    .put_all(batch, Ttl::Infinite, WritePolicy::InsertIfAbsent)
                    .unwrap()
            })
        })
        .collect();

    let winners = workers
        .into_iter()
        .map(|w| w.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);

    let values = handle.get_all(["a", "b", "c"]);
    let winner = &values["a"];
    assert!(values.values().all(|v| v == winner));
}

#[test]
fn test_replace_only_touches_existing() {
    let handle = start("scenario-replace");
    assert!(!handle
        .put("k", json!(1), Ttl::Infinite, WritePolicy::Replace)
        .unwrap());
    assert!(!handle.has_key("k"));

    handle
        .put("k", json!(1), Ttl::Infinite, WritePolicy::Insert)
        .unwrap();
    assert!(handle
        .put("k", json!(2), Ttl::from_secs(60), WritePolicy::Replace)
        .unwrap());
    assert_eq!(handle.get("k"), Some(json!(2)));
    assert!(matches!(handle.ttl("k"), Some(Ttl::Finite(_))));
}

#[test]
fn test_bulk_insert_on_full_cache_respects_limit() {
    let handle = CacheHandle::start(&Config {
        name: "scenario-bounded".to_string(),
        max_entries: 2,
        eviction: EvictionPolicy::Lru,
        ..Config::default()
    });
    for key in ["a", "c"] {
        handle
            .put(key, json!(key), Ttl::Infinite, WritePolicy::Insert)
            .unwrap();
    }
    handle.get("c");

    let batch = vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))];
    assert!(handle
        .put_all(batch, Ttl::Infinite, WritePolicy::Insert)
        .unwrap());

    assert_eq!(handle.count_all(&Query::Everything).unwrap(), 2);
    assert_eq!(handle.get("a"), Some(json!(1)));
    assert_eq!(handle.get("b"), Some(json!(2)));
}

// == Persistence Scenarios ==

#[test]
fn test_snapshot_skips_entries_expired_before_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    let source = start("scenario-dump");
    source
        .put("keep", json!("k"), Ttl::Infinite, WritePolicy::Insert)
        .unwrap();
    source
        .put("short", json!("s"), Ttl::from_millis(40), WritePolicy::Insert)
        .unwrap();
    source.dump(&path).unwrap();
    sleep(Duration::from_millis(80));

    let target = start("scenario-load");
    target.load(&path).unwrap();

    assert_eq!(target.get("keep"), Some(json!("k")));
    assert_eq!(target.get("short"), None);
}

#[test]
fn test_load_garbage_is_invalid_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.json");
    std::fs::write(&path, b"{ not json").unwrap();

    match start("scenario-garbage").load(&path) {
        Err(CacheError::Persistence(err)) => {
            assert_eq!(err.reason, PersistenceReason::InvalidSnapshot)
        }
        other => panic!("expected a persistence error, got {:?}", other),
    }
}

// == Instance Scenarios ==

#[test]
fn test_instances_are_isolated() {
    let first = start("first");
    let second = start("second");
    doubled(&first);

    assert_eq!(first.count_all(&Query::Everything).unwrap(), 10);
    assert_eq!(second.count_all(&Query::Everything).unwrap(), 0);
    assert_eq!(first.stats().unwrap().metadata.name, "first");
    assert_eq!(second.stats().unwrap().metadata.name, "second");
}
