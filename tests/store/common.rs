//! Shared helpers for the store integration suite.

use std::time::Duration;
use vellumdb::{Document, DocumentId, Store, StoreConfig, Transaction, TransactionMode, Value};

/// Build a document from field/value pairs.
pub fn doc(pairs: &[(&str, Value)]) -> Document {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Create and commit a single document, returning its id.
pub fn seed(store: &Store, pairs: &[(&str, Value)]) -> DocumentId {
    let mut txn = store
        .open_transaction(TransactionMode::ReadWrite)
        .expect("open seed transaction");
    let id = txn.create(doc(pairs)).expect("stage seed document");
    txn.commit().expect("commit seed document");
    id
}

/// A store whose GC sweeps on every transaction end, for deterministic
/// pruning in tests.
pub fn store_with_eager_gc() -> Store {
    Store::with_config(StoreConfig::new().with_gc_interval(Duration::ZERO))
}

/// Open a read-write transaction, panicking on failure.
pub fn rw(store: &Store) -> Transaction {
    store
        .open_transaction(TransactionMode::ReadWrite)
        .expect("open read-write transaction")
}

/// Open a read-only transaction, panicking on failure.
pub fn ro(store: &Store) -> Transaction {
    store
        .open_transaction(TransactionMode::ReadOnly)
        .expect("open read-only transaction")
}
