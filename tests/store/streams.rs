//! Streaming: buffered and rendezvous handoff, snapshot capture,
//! cancellation.

use crate::common::{doc, rw, seed};
use std::collections::HashSet;
use std::thread;
use std::time::Duration;
use vellumdb::{Store, TransactionMode, Value};

#[test]
fn stream_yields_every_committed_document() {
    let store = Store::new();
    let ids: HashSet<String> = (0..20)
        .map(|i| seed(&store, &[("i", Value::Int(i))]))
        .collect();

    for capacity in [0, 1, 8, 64] {
        let stream = store.stream(capacity).unwrap();
        let seen: HashSet<String> = stream
            .collect_remaining()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(seen, ids, "capacity {capacity}");
    }
}

#[test]
fn stream_snapshot_ignores_later_commits() {
    let store = Store::new();
    seed(&store, &[("wave", Value::Int(1))]);
    seed(&store, &[("wave", Value::Int(1))]);

    let stream = store.stream(0).unwrap();

    // Committed after the stream captured its snapshot.
    seed(&store, &[("wave", Value::Int(2))]);

    let results = stream.collect_remaining();
    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|d| d.data["wave"] == Value::Int(1)));
}

#[test]
fn transaction_stream_respects_the_snapshot_and_skips_the_buffer() {
    let store = Store::new();
    let committed = seed(&store, &[("kind", "committed".into())]);

    let mut txn = rw(&store);
    txn.create(doc(&[("kind", "buffered".into())])).unwrap();

    // Committed by someone else after this transaction opened.
    seed(&store, &[("kind", "late".into())]);

    let stream = txn.stream(4).unwrap();
    let results = stream.collect_remaining();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, committed);
}

#[test]
fn closing_a_stream_unblocks_and_terminates_it() {
    let store = Store::new();
    for i in 0..100 {
        seed(&store, &[("i", Value::Int(i))]);
    }

    // Rendezvous channel, nothing consumed yet: the producer is parked.
    let stream = store.stream(0).unwrap();
    assert!(stream.next().is_some());
    stream.close();
    assert!(stream.next().is_none());
    assert!(stream.next().is_none());
}

#[test]
fn close_from_another_thread_is_safe() {
    let store = Store::new();
    for i in 0..50 {
        seed(&store, &[("i", Value::Int(i))]);
    }

    let stream = std::sync::Arc::new(store.stream(1).unwrap());
    let consumer = {
        let stream = std::sync::Arc::clone(&stream);
        thread::spawn(move || {
            let mut n = 0;
            while stream.next().is_some() {
                n += 1;
                thread::sleep(Duration::from_millis(1));
            }
            n
        })
    };
    thread::sleep(Duration::from_millis(10));
    stream.close();

    // The consumer terminates early; it cannot have seen everything.
    let consumed = consumer.join().unwrap();
    assert!(consumed < 50);
    assert!(stream.next().is_none());
}

#[test]
fn stream_on_empty_store_ends_immediately() {
    let store = Store::new();
    let stream = store.stream(4).unwrap();
    assert!(stream.next().is_none());

    let reader = store.open_transaction(TransactionMode::ReadOnly).unwrap();
    let txn_stream = reader.stream(0).unwrap();
    assert!(txn_stream.next().is_none());
}

#[test]
fn stream_excludes_deleted_documents() {
    let store = Store::new();
    let keep = seed(&store, &[("keep", Value::Bool(true))]);
    let drop_me = seed(&store, &[("keep", Value::Bool(false))]);

    let mut txn = rw(&store);
    txn.delete(&drop_me).unwrap();
    txn.commit().unwrap();

    let results = store.stream(8).unwrap().collect_remaining();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, keep);
}
