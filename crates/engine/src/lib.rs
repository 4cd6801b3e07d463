//! Storage engine for vellumdb
//!
//! This crate orchestrates the lower layers into the public surface:
//! - Store: registries, lifecycle, index management, commit application
//! - Transaction: buffered reads/writes against a fixed snapshot
//! - FieldIndex: ordered secondary indexes with exact/range/prefix scans
//! - DocumentStream / Cursor: point-in-time iteration
//!
//! The engine is the only component that coordinates across layers; the
//! concurrency crate knows nothing about indexes, and indexes know
//! nothing about visibility.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod cursor;
pub mod index;
pub mod store;
pub mod stream;
pub mod transaction;

pub use config::{StoreConfig, DEFAULT_GC_INTERVAL};
pub use cursor::{Cursor, CursorEntry};
pub use index::FieldIndex;
pub use store::Store;
pub use stream::DocumentStream;
pub use transaction::Transaction;

// Re-export the concurrency types that appear in the public API
pub use vellum_concurrency::{TransactionMode, TransactionStatus};

// Re-export core types for convenience
pub use vellum_core::{
    Document, DocumentId, DocumentResult, IdProvider, Result, StoreError, UuidProvider, Value,
};
