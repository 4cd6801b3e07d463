//! # vellumdb
//!
//! An embedded, in-process, in-memory document database: schemaless
//! records with MVCC snapshot isolation, ordered secondary indexes, and
//! point-in-time streams and cursors. Data is volatile by design; there
//! is no disk format, no wire protocol, and no query language.
//!
//! # Quick Start
//!
//! ```
//! use vellumdb::{Store, TransactionMode, Value};
//!
//! fn main() -> vellumdb::Result<()> {
//!     let store = Store::new();
//!
//!     // Writes buffer inside a transaction and land atomically at commit.
//!     let mut txn = store.open_transaction(TransactionMode::ReadWrite)?;
//!     let id = txn.create_json(serde_json::json!({
//!         "title": "Dune",
//!         "pages": 412,
//!     }))?;
//!     txn.commit()?;
//!
//!     // Secondary indexes answer exact, range, and prefix queries.
//!     store.create_index("by_pages", &["pages"])?;
//!     let reader = store.open_transaction(TransactionMode::ReadOnly)?;
//!     let hits = reader.find_by_index("by_pages", &[Value::Int(412)])?;
//!     assert!(hits.contains_key(&id));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency model
//!
//! Every public operation is thread-safe. Readers resolve against
//! immutable versions selected by their snapshot timestamp and never
//! block writers; writers buffer privately and install everything under
//! one critical section, so no reader ever observes a torn commit.
//! Conflict handling is last-writer-wins per document — there is no
//! transactional conflict detection.
//!
//! # What this crate is not
//!
//! No persistence or crash recovery, no replication, no cross-document
//! conflict detection, no schema validation, no SQL. The store is a
//! library; its API surface is the whole interface.

// The engine crate carries the implementation; this crate is the stable
// public surface.
pub use vellum_engine::*;
