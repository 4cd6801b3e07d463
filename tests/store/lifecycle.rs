//! Document CRUD, the transaction state machine, and close interlocks.

use crate::common::{doc, ro, rw, seed};
use vellumdb::{Store, StoreError, TransactionMode, Value};

#[test]
fn insert_read_update_delete_round_trip() {
    let store = Store::new();
    let id = seed(&store, &[("title", "A".into())]);

    let reader = ro(&store);
    assert_eq!(reader.read(&id).unwrap(), doc(&[("title", "A".into())]));
    assert_eq!(store.get(&id).unwrap().revision, 1);

    let mut txn = rw(&store);
    txn.update(&id, doc(&[("title", "B".into()), ("pages", Value::Int(3))]))
        .unwrap();
    txn.commit().unwrap();

    let updated = store.get(&id).unwrap();
    assert_eq!(
        updated.data,
        doc(&[("title", "B".into()), ("pages", Value::Int(3))])
    );
    assert_eq!(updated.revision, 2);

    let mut txn = rw(&store);
    txn.delete(&id).unwrap();
    txn.commit().unwrap();

    let err = ro(&store).read(&id).unwrap_err();
    assert_eq!(err, StoreError::DocumentDeleted { id: id.clone() });
    assert!(err.is_missing_document());
}

#[test]
fn read_your_writes_within_a_transaction() {
    let store = Store::new();
    let mut txn = rw(&store);

    let id = txn.create(doc(&[("n", Value::Int(1))])).unwrap();
    assert_eq!(txn.read(&id).unwrap(), doc(&[("n", Value::Int(1))]));

    txn.update(&id, doc(&[("n", Value::Int(2))])).unwrap();
    assert_eq!(txn.read(&id).unwrap(), doc(&[("n", Value::Int(2))]));

    txn.delete(&id).unwrap();
    assert_eq!(
        txn.read(&id).unwrap_err(),
        StoreError::DocumentDeleted { id: id.clone() }
    );
    assert!(!txn.exists(&id).unwrap());

    // Nothing committed: other transactions never saw any of it.
    txn.commit().unwrap();
    assert_eq!(
        store.get(&id).unwrap_err(),
        StoreError::DocumentDeleted { id }
    );
}

#[test]
fn uncommitted_writes_are_invisible_to_others() {
    let store = Store::new();
    let mut writer = rw(&store);
    let id = writer.create(doc(&[("x", Value::Int(1))])).unwrap();

    let reader = ro(&store);
    assert_eq!(
        reader.read(&id).unwrap_err(),
        StoreError::DocumentNotFound { id: id.clone() }
    );

    writer.commit().unwrap();
    // The earlier reader's snapshot predates the commit.
    assert_eq!(
        reader.read(&id).unwrap_err(),
        StoreError::DocumentNotFound { id: id.clone() }
    );
    // A fresh reader sees it.
    assert!(ro(&store).exists(&id).unwrap());
}

#[test]
fn rollback_discards_buffered_writes() {
    let store = Store::new();
    let existing = seed(&store, &[("keep", Value::Bool(true))]);

    let mut txn = rw(&store);
    let id = txn.create(doc(&[("ephemeral", Value::Bool(true))])).unwrap();
    txn.update(&existing, doc(&[("keep", Value::Bool(false))]))
        .unwrap();
    txn.rollback();
    // Rollback is idempotent.
    txn.rollback();

    assert_eq!(
        store.get(&id).unwrap_err(),
        StoreError::DocumentNotFound { id }
    );
    assert_eq!(
        store.get(&existing).unwrap().data,
        doc(&[("keep", Value::Bool(true))])
    );
}

#[test]
fn operations_fail_after_terminal_states() {
    let store = Store::new();
    let id = seed(&store, &[("n", Value::Int(0))]);

    let mut committed = rw(&store);
    committed.commit().unwrap();
    assert_eq!(
        committed.read(&id).unwrap_err(),
        StoreError::TransactionClosed
    );
    assert_eq!(
        committed.create(doc(&[])).unwrap_err(),
        StoreError::TransactionClosed
    );
    assert_eq!(committed.commit().unwrap_err(), StoreError::TransactionClosed);

    let mut rolled_back = rw(&store);
    rolled_back.rollback();
    assert_eq!(
        rolled_back.read_all().unwrap_err(),
        StoreError::TransactionClosed
    );
    assert!(!rolled_back.is_open());
}

#[test]
fn read_only_transactions_reject_mutations() {
    let store = Store::new();
    let id = seed(&store, &[("n", Value::Int(0))]);

    let mut reader = ro(&store);
    assert_eq!(
        reader.create(doc(&[])).unwrap_err(),
        StoreError::ReadOnlyTransaction
    );
    assert_eq!(
        reader.update(&id, doc(&[])).unwrap_err(),
        StoreError::ReadOnlyTransaction
    );
    assert_eq!(
        reader.delete(&id).unwrap_err(),
        StoreError::ReadOnlyTransaction
    );
    // Reads are fine, and commit just closes.
    assert!(reader.exists(&id).unwrap());
    reader.commit().unwrap();
}

#[test]
fn update_and_delete_require_a_resolvable_target() {
    let store = Store::new();
    let mut txn = rw(&store);
    assert_eq!(
        txn.update("no-such-id", doc(&[])).unwrap_err(),
        StoreError::DocumentNotFound {
            id: "no-such-id".into()
        }
    );
    assert_eq!(
        txn.delete("no-such-id").unwrap_err(),
        StoreError::DocumentNotFound {
            id: "no-such-id".into()
        }
    );

    // A document deleted in this transaction cannot be deleted again.
    let id = txn.create(doc(&[("n", Value::Int(1))])).unwrap();
    txn.delete(&id).unwrap();
    assert_eq!(
        txn.delete(&id).unwrap_err(),
        StoreError::DocumentDeleted { id }
    );
}

#[test]
fn non_object_json_is_invalid_data() {
    let store = Store::new();
    let mut txn = rw(&store);
    assert_eq!(
        txn.create_json(serde_json::json!([1, 2, 3])).unwrap_err(),
        StoreError::InvalidData
    );
    assert_eq!(
        txn.create_json(serde_json::json!(null)).unwrap_err(),
        StoreError::InvalidData
    );
    let id = txn
        .create_json(serde_json::json!({"nested": {"deep": [1, 2]}}))
        .unwrap();
    assert_eq!(
        txn.update_json(&id, serde_json::json!("flat")).unwrap_err(),
        StoreError::InvalidData
    );
}

#[test]
fn create_then_delete_in_one_transaction_commits_as_deleted() {
    let store = Store::new();
    let mut txn = rw(&store);
    let id = txn.create(doc(&[("n", Value::Int(1))])).unwrap();
    txn.delete(&id).unwrap();
    txn.commit().unwrap();

    assert_eq!(
        store.get(&id).unwrap_err(),
        StoreError::DocumentDeleted { id: id.clone() }
    );
    assert_eq!(
        ro(&store).read(&id).unwrap_err(),
        StoreError::DocumentDeleted { id }
    );
}

#[test]
fn close_interlocks_every_operation() {
    let store = Store::new();
    let id = seed(&store, &[("n", Value::Int(0))]);
    store.create_index("by_n", &["n"]).unwrap();

    let mut open_before_close = rw(&store);
    open_before_close
        .update(&id, doc(&[("n", Value::Int(1))]))
        .unwrap();

    store.close();
    assert!(store.is_closed());

    assert_eq!(
        store.open_transaction(TransactionMode::ReadWrite).unwrap_err(),
        StoreError::StoreClosed
    );
    assert_eq!(store.get(&id).unwrap_err(), StoreError::StoreClosed);
    assert_eq!(
        store.create_index("late", &["x"]).unwrap_err(),
        StoreError::StoreClosed
    );
    assert_eq!(store.drop_index("by_n").unwrap_err(), StoreError::StoreClosed);
    assert_eq!(store.list_indexes().unwrap_err(), StoreError::StoreClosed);
    assert_eq!(store.stream(4).unwrap_err(), StoreError::StoreClosed);
    assert!(matches!(store.cursor(), Err(StoreError::StoreClosed)));
    assert!(matches!(
        store.cursor_by_index("by_n"),
        Err(StoreError::StoreClosed)
    ));

    // The in-flight transaction is interlocked too; its buffered write
    // is never applied.
    assert_eq!(
        open_before_close.read(&id).unwrap_err(),
        StoreError::StoreClosed
    );
    assert_eq!(
        open_before_close.commit().unwrap_err(),
        StoreError::StoreClosed
    );

    // Closing again is a no-op.
    store.close();
}

#[test]
fn store_handles_share_state() {
    let store = Store::new();
    let clone = store.clone();
    let id = seed(&clone, &[("shared", Value::Bool(true))]);
    assert!(ro(&store).exists(&id).unwrap());
    clone.close();
    assert!(store.is_closed());
}
