//! Integration tests for the kapp application service

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use kapplang::event_store::{EventStore, EventStoreResult, InMemoryEventStore};
use kapplang::types::{Appended, EventKind, RecordedEvent};
use kapplang::{KappError, KapplangApp, GROUNDED_KAPPS, MAX_LITERAL};
use uuid::Uuid;

fn setup_test_app() -> (KapplangApp<InMemoryEventStore>, Uuid) {
    let app = KapplangApp::new(InMemoryEventStore::new());
    let stack_id = app.create_stack().unwrap();
    (app, stack_id)
}

fn push<S: EventStore>(app: &KapplangApp<S>, stack_id: Uuid, value: i64) {
    for kapp in app.push_int(value).unwrap() {
        app.dispatch(stack_id, kapp).unwrap();
    }
}

#[test]
fn test_push_zero() {
    let (app, stack_id) = setup_test_app();

    app.dispatch(stack_id, "zero").unwrap();
    assert_eq!(app.get_stack(stack_id).unwrap(), vec![0]);

    app.dispatch(stack_id, "zero").unwrap();
    assert_eq!(app.get_stack(stack_id).unwrap(), vec![0, 0]);
}

#[test]
fn test_dup() {
    let (app, stack_id) = setup_test_app();
    push(&app, stack_id, 1);
    app.dispatch(stack_id, "dup").unwrap();
    assert_eq!(app.get_stack(stack_id).unwrap(), vec![1, 1]);
}

#[test]
fn test_swap() {
    let (app, stack_id) = setup_test_app();
    push(&app, stack_id, 1);
    push(&app, stack_id, 2);
    app.dispatch(stack_id, "swap").unwrap();
    assert_eq!(app.get_stack(stack_id).unwrap(), vec![2, 1]);
}

#[test]
fn test_succ_and_pred() {
    let (app, stack_id) = setup_test_app();
    push(&app, stack_id, 0);
    app.dispatch(stack_id, "succ").unwrap();
    assert_eq!(app.get_stack(stack_id).unwrap(), vec![1]);

    app.dispatch(stack_id, "pred").unwrap();
    app.dispatch(stack_id, "pred").unwrap();
    assert_eq!(app.get_stack(stack_id).unwrap(), vec![-1]);
}

#[test]
fn test_arithmetic() {
    let cases = [
        (1, 2, "add", 3),
        (3, 2, "sub", 1),
        (2, 3, "mul", 6),
        (6, 2, "div", 3),
        (-7, 2, "div", -4),
        (1, 0, "div", 0),
    ];

    for (b, a, kapp, expected) in cases {
        let (app, stack_id) = setup_test_app();
        push(&app, stack_id, b);
        push(&app, stack_id, a);
        app.dispatch(stack_id, kapp).unwrap();
        assert_eq!(
            app.get_stack(stack_id).unwrap(),
            vec![expected],
            "{b} {a} {kapp}"
        );
    }
}

#[test]
fn test_every_dispatch_appends_exactly_one_event() {
    let (app, stack_id) = setup_test_app();

    // Starts empty, so the first few are no-ops
    let script = [
        "pop", "dup", "swap", "succ", "pred", "add", "zero", "sub", "mul", "div", "dup", "swap",
        "add", "div", "pop", "pop",
    ];

    for kapp in script {
        let version_before = app.store().version(stack_id).unwrap();
        let position_before = app.store().last_position().unwrap();

        let version = app.dispatch(stack_id, kapp).unwrap();

        assert_eq!(version, version_before + 1, "{kapp}");
        assert_eq!(app.store().last_position().unwrap(), position_before + 1);
        let last = app.store().load_events(stack_id).unwrap().pop().unwrap();
        assert_eq!(last.kind.as_str(), kapp);
        assert_eq!(last.sequence, version);
    }

    assert!(app.get_stack(stack_id).unwrap().is_empty());
}

#[test]
fn test_ungrounded_kapp_is_rejected() {
    let (app, stack_id) = setup_test_app();
    push(&app, stack_id, 2);
    let version = app.store().version(stack_id).unwrap();

    for name in ["noop", "create", "__init__", "rot"] {
        let err = app.dispatch(stack_id, name).unwrap_err();
        assert!(matches!(err, KappError::UngroundedOperation(ref n) if n == name));
        assert!(!err.is_retryable());
    }

    assert_eq!(app.store().version(stack_id).unwrap(), version);
    assert_eq!(app.get_stack(stack_id).unwrap(), vec![2]);
}

#[test]
fn test_extreme_literals_are_refused() {
    let (app, stack_id) = setup_test_app();
    push(&app, stack_id, 1);

    for value in [i64::MIN, i64::MAX] {
        assert!(matches!(
            app.push_int(value),
            Err(KappError::LiteralOutOfRange { max: MAX_LITERAL, .. })
        ));
        assert!(app.push(stack_id, value).is_err());
    }

    assert_eq!(app.get_stack(stack_id).unwrap(), vec![1]);
    assert_eq!(app.store().version(stack_id).unwrap(), 3);
}

#[test]
fn test_get_stack_unknown() {
    let (app, _) = setup_test_app();
    let missing = Uuid::new_v4();

    let err = app.get_stack(missing).unwrap_err();
    assert!(matches!(err, KappError::NotFound(id) if id == missing));
}

#[test]
fn test_event_log() {
    let (app, other) = setup_test_app();
    push(&app, other, 3);

    let start_log_length = app.get_event_log(1).unwrap().len() as u64;
    let stack_id = app.create_stack().unwrap();
    let mut kapps = app.push_int(1).unwrap();
    kapps.extend(["dup", "swap", "add"]);
    for kapp in &kapps {
        app.dispatch(stack_id, kapp).unwrap();
    }

    let event_log = app.get_event_log(start_log_length + 1).unwrap();

    let mut expected_kapps = vec!["create"];
    expected_kapps.extend(&kapps);
    let actual_kapps: Vec<&str> = event_log.iter().map(|e| e.kind.as_str()).collect();
    assert_eq!(actual_kapps, expected_kapps);

    for (i, entry) in event_log.iter().enumerate() {
        assert_eq!(entry.position, start_log_length + 1 + i as u64);
        assert_eq!(entry.aggregate_id, stack_id);
        assert_eq!(entry.version, i as u64 + 1);
    }
}

#[test]
fn test_event_log_reads_are_idempotent() {
    let (app, stack_id) = setup_test_app();
    push(&app, stack_id, 4);
    app.dispatch(stack_id, "dup").unwrap();

    assert_eq!(app.get_event_log(3).unwrap(), app.get_event_log(3).unwrap());
    assert_eq!(app.get_event_log(0).unwrap(), app.get_event_log(1).unwrap());
    assert!(app.get_event_log(1000).unwrap().is_empty());
}

#[test]
fn test_adjacent_reads_neither_skip_nor_repeat() {
    let (app, stack_id) = setup_test_app();
    push(&app, stack_id, 25);

    let all = app.get_event_log(1).unwrap();
    for split in [2, 11, 20, 27] {
        let mut joined = app.get_event_log(1).unwrap();
        joined.truncate(split as usize - 1);
        joined.extend(app.get_event_log(split).unwrap());
        assert_eq!(joined, all);
    }
}

#[test]
fn test_kapp_counts() {
    let (app, _) = setup_test_app();

    let start_log_length = app.get_event_log(1).unwrap().len() as u64;
    let stack_id = app.create_stack().unwrap();
    let mut kapps = app.push_int(1).unwrap();
    kapps.extend(["dup", "swap", "add"]);
    for kapp in &kapps {
        app.dispatch(stack_id, kapp).unwrap();
    }

    let kapp_counts = app.get_kapp_counts(start_log_length + 1).unwrap();

    assert_eq!(kapp_counts.len(), 5);
    for kapp in ["zero", "succ", "dup", "swap", "add"] {
        assert_eq!(kapp_counts[kapp], 1, "{kapp}");
    }
    assert!(!kapp_counts.contains_key("create"));
    assert!(kapp_counts.keys().all(|k| GROUNDED_KAPPS.contains(&k.as_str())));
}

#[test]
fn test_kapp_counts_across_stacks() {
    let (app, first) = setup_test_app();
    let second = app.create_stack().unwrap();

    push(&app, first, 2);
    push(&app, second, -1);
    app.dispatch(first, "add").unwrap();

    let counts = app.get_kapp_counts(0).unwrap();
    assert_eq!(counts["zero"], 2);
    assert_eq!(counts["succ"], 2);
    assert_eq!(counts["pred"], 1);
    assert_eq!(counts["add"], 1);
    assert_eq!(counts.values().sum::<usize>(), 6);
}

#[test]
fn test_concurrent_dispatch_to_different_stacks() {
    let app = Arc::new(KapplangApp::new(InMemoryEventStore::new()));
    let mut handles = Vec::new();

    for value in 0..8i64 {
        let app = Arc::clone(&app);
        handles.push(thread::spawn(move || {
            let stack_id = app.create_stack().unwrap();
            push(&app, stack_id, value);
            app.dispatch(stack_id, "dup").unwrap();
            app.dispatch(stack_id, "mul").unwrap();
            (stack_id, value)
        }));
    }

    for handle in handles {
        let (stack_id, value) = handle.join().unwrap();
        assert_eq!(app.get_stack(stack_id).unwrap(), vec![value * value]);
    }

    let positions: Vec<u64> = app.get_event_log(1).unwrap().iter().map(|e| e.position).collect();
    let expected: Vec<u64> = (1..=positions.len() as u64).collect();
    assert_eq!(positions, expected);
}

#[test]
fn test_concurrent_dispatch_to_same_stack() {
    let (app, stack_id) = setup_test_app();
    let app = Arc::new(app);
    let mut handles = Vec::new();

    for _ in 0..8 {
        let app = Arc::clone(&app);
        handles.push(thread::spawn(move || {
            let mut succeeded = 0u64;
            for _ in 0..25 {
                match app.dispatch(stack_id, "zero") {
                    Ok(_) => succeeded += 1,
                    Err(e) => assert!(e.is_retryable(), "unexpected error: {e}"),
                }
            }
            succeeded
        }));
    }

    let succeeded: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(app.store().version(stack_id).unwrap(), 1 + succeeded);
    assert_eq!(app.get_stack(stack_id).unwrap().len() as u64, succeeded);
}

/// Store that lets another writer slip in just before the first guarded append
struct RacingStore {
    inner: InMemoryEventStore,
    armed: AtomicBool,
}

impl EventStore for RacingStore {
    fn append(
        &self,
        aggregate_id: Uuid,
        expected_version: u64,
        kind: EventKind,
        payload: Option<serde_json::Value>,
    ) -> EventStoreResult<Appended> {
        if expected_version > 0 && self.armed.swap(false, Ordering::SeqCst) {
            self.inner
                .append(aggregate_id, expected_version, EventKind::Zero, None)?;
        }
        self.inner.append(aggregate_id, expected_version, kind, payload)
    }

    fn load_events(&self, aggregate_id: Uuid) -> EventStoreResult<Vec<RecordedEvent>> {
        self.inner.load_events(aggregate_id)
    }

    fn read_from(&self, position: u64, limit: usize) -> EventStoreResult<Vec<RecordedEvent>> {
        self.inner.read_from(position, limit)
    }

    fn last_position(&self) -> EventStoreResult<u64> {
        self.inner.last_position()
    }
}

#[test]
fn test_stale_write_is_a_concurrency_conflict() {
    let app = KapplangApp::new(RacingStore {
        inner: InMemoryEventStore::new(),
        armed: AtomicBool::new(true),
    });
    let stack_id = app.create_stack().unwrap();

    let err = app.dispatch(stack_id, "dup").unwrap_err();

    assert!(err.is_retryable());
    assert!(matches!(
        err,
        KappError::ConcurrencyConflict { aggregate_id, expected: 1, actual: 2 } if aggregate_id == stack_id
    ));

    // Only the interloper's event landed; retrying against a fresh load works
    let log = app.get_event_log(1).unwrap();
    let kinds: Vec<&str> = log.iter().map(|e| e.kind.as_str()).collect();
    assert_eq!(kinds, vec!["create", "zero"]);

    assert_eq!(app.dispatch(stack_id, "dup").unwrap(), 3);
    assert_eq!(app.get_stack(stack_id).unwrap(), vec![0, 0]);
}
