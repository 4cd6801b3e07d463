//! Snapshot visibility, deep-copy isolation, and atomic multi-document
//! commits.

use crate::common::{doc, ro, rw, seed, store_with_eager_gc};
use vellumdb::{Store, StoreError, Value};

#[test]
fn reader_survives_concurrent_deletion() {
    let store = Store::new();
    let id = seed(&store, &[("payload", "original".into())]);

    let reader = ro(&store);

    let mut deleter = rw(&store);
    deleter.delete(&id).unwrap();
    deleter.commit().unwrap();

    // The pre-delete snapshot still resolves the old data.
    assert_eq!(reader.read(&id).unwrap(), doc(&[("payload", "original".into())]));
    // A fresh snapshot observes the tombstone.
    assert_eq!(
        ro(&store).read(&id).unwrap_err(),
        StoreError::DocumentDeleted { id }
    );
}

#[test]
fn reads_are_repeatable_within_a_transaction() {
    let store = Store::new();
    let id = seed(&store, &[("n", Value::Int(1))]);

    let reader = ro(&store);
    assert_eq!(reader.read(&id).unwrap(), doc(&[("n", Value::Int(1))]));

    for i in 2..5 {
        let mut writer = rw(&store);
        writer.update(&id, doc(&[("n", Value::Int(i))])).unwrap();
        writer.commit().unwrap();
        // Same snapshot, same answer, no matter how many commits land.
        assert_eq!(reader.read(&id).unwrap(), doc(&[("n", Value::Int(1))]));
    }
    assert_eq!(ro(&store).read(&id).unwrap(), doc(&[("n", Value::Int(4))]));
}

#[test]
fn multi_document_commits_are_all_or_nothing() {
    let store = Store::new();

    let mut writer = rw(&store);
    let a = writer.create(doc(&[("k", Value::Int(1))])).unwrap();
    let b = writer.create(doc(&[("k", Value::Int(1))])).unwrap();

    let before = ro(&store);
    writer.commit().unwrap();
    let after = ro(&store);

    // The pre-commit snapshot sees neither document, the post-commit
    // snapshot sees both.
    assert!(!before.exists(&a).unwrap());
    assert!(!before.exists(&b).unwrap());
    assert!(after.exists(&a).unwrap());
    assert!(after.exists(&b).unwrap());
}

#[test]
fn returned_documents_are_deep_copies() {
    let store = Store::new();
    let id = seed(
        &store,
        &[(
            "tags",
            Value::Array(vec![Value::String("keep".into())]),
        )],
    );

    let reader = ro(&store);
    let mut stolen = reader.read(&id).unwrap();
    match stolen.get_mut("tags") {
        Some(Value::Array(items)) => items.push(Value::String("injected".into())),
        other => panic!("expected tags array, got {other:?}"),
    }
    stolen.insert("extra".to_string(), Value::Bool(true));

    // Mutating the returned copy changes nothing anyone else reads.
    let fresh = reader.read(&id).unwrap();
    assert_eq!(
        fresh,
        doc(&[("tags", Value::Array(vec![Value::String("keep".into())]))])
    );
    assert_eq!(store.get(&id).unwrap().data, fresh);
}

#[test]
fn buffered_documents_are_deep_copies_too() {
    let store = Store::new();
    let mut txn = rw(&store);
    let id = txn
        .create(doc(&[("list", Value::Array(vec![Value::Int(1)]))]))
        .unwrap();

    let mut first = txn.read(&id).unwrap();
    if let Some(Value::Array(items)) = first.get_mut("list") {
        items.clear();
    }
    assert_eq!(
        txn.read(&id).unwrap(),
        doc(&[("list", Value::Array(vec![Value::Int(1)]))])
    );
}

#[test]
fn read_all_overlays_the_write_buffer() {
    let store = Store::new();
    let committed = seed(&store, &[("kind", "old".into())]);
    let doomed = seed(&store, &[("kind", "doomed".into())]);

    let mut txn = rw(&store);
    let fresh = txn.create(doc(&[("kind", "new".into())])).unwrap();
    txn.update(&committed, doc(&[("kind", "patched".into())]))
        .unwrap();
    txn.delete(&doomed).unwrap();

    let all = txn.read_all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[&fresh], doc(&[("kind", "new".into())]));
    assert_eq!(all[&committed], doc(&[("kind", "patched".into())]));
    assert!(!all.contains_key(&doomed));
    assert_eq!(txn.count().unwrap(), 2);

    // Another transaction sees none of the buffer.
    let other = ro(&store).read_all().unwrap();
    assert_eq!(other.len(), 2);
    assert_eq!(other[&committed], doc(&[("kind", "old".into())]));
    assert!(other.contains_key(&doomed));
}

#[test]
fn snapshots_hold_under_eager_garbage_collection() {
    let store = store_with_eager_gc();
    let id = seed(&store, &[("n", Value::Int(0))]);

    let old_reader = ro(&store);

    // Every commit below also triggers a GC sweep (zero interval), with
    // the old reader's snapshot pinning its visible version.
    for i in 1..=20 {
        let mut writer = rw(&store);
        writer.update(&id, doc(&[("n", Value::Int(i))])).unwrap();
        writer.commit().unwrap();
    }

    assert_eq!(old_reader.read(&id).unwrap(), doc(&[("n", Value::Int(0))]));
    assert_eq!(store.get(&id).unwrap().data, doc(&[("n", Value::Int(20))]));
    assert_eq!(store.get(&id).unwrap().revision, 21);

    // Once the old reader ends, the next sweep may reclaim history, and
    // current state is unaffected.
    drop(old_reader);
    let mut touch = rw(&store);
    touch.commit().unwrap();
    assert_eq!(store.get(&id).unwrap().data, doc(&[("n", Value::Int(20))]));
}
