//! Error types for vellumdb
//!
//! One unified `StoreError` enum covers every failure a public operation
//! can return. Variants are distinct, stable, and testable; callers match
//! on them directly. We use `thiserror` for `Display` and `Error` trait
//! implementations.
//!
//! Failures are local: an error is returned to the immediate caller and
//! never panics across the API boundary. Commit is all-or-nothing, so no
//! error leaves a partially applied transaction observable.

use thiserror::Error;

/// Unified error type for all store, transaction, index, stream, and
/// cursor operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Operation on a store after shutdown.
    #[error("store closed")]
    StoreClosed,

    /// Identifier absent under the reader's view.
    #[error("document not found: {id}")]
    DocumentNotFound {
        /// The identifier that failed to resolve.
        id: String,
    },

    /// Identifier resolves to a tombstone under the reader's view.
    #[error("document has been deleted: {id}")]
    DocumentDeleted {
        /// The deleted document's identifier.
        id: String,
    },

    /// Index creation with a name that is already registered.
    #[error("index already exists: {name}")]
    IndexExists {
        /// The conflicting index name.
        name: String,
    },

    /// Index creation with zero declared fields.
    #[error("cannot create an index with no fields")]
    EmptyIndex,

    /// Operation names an index that is not registered.
    #[error("index does not exist: {name}")]
    IndexNotFound {
        /// The missing index name.
        name: String,
    },

    /// Operation on a closed or cancelled stream or cursor.
    #[error("stream closed")]
    StreamClosed,

    /// Malformed document passed to create or update.
    #[error("invalid document data")]
    InvalidData,

    /// Operation on a transaction that has committed or rolled back.
    #[error("transaction closed")]
    TransactionClosed,

    /// Mutation attempted through a read-only transaction.
    #[error("transaction is read-only")]
    ReadOnlyTransaction,
}

impl StoreError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::StoreClosed => "StoreClosed",
            StoreError::DocumentNotFound { .. } => "DocumentNotFound",
            StoreError::DocumentDeleted { .. } => "DocumentDeleted",
            StoreError::IndexExists { .. } => "IndexExists",
            StoreError::EmptyIndex => "EmptyIndex",
            StoreError::IndexNotFound { .. } => "IndexNotFound",
            StoreError::StreamClosed => "StreamClosed",
            StoreError::InvalidData => "InvalidData",
            StoreError::TransactionClosed => "TransactionClosed",
            StoreError::ReadOnlyTransaction => "ReadOnlyTransaction",
        }
    }

    /// Whether this error means the target document is absent or deleted
    /// under the reader's view.
    pub fn is_missing_document(&self) -> bool {
        matches!(
            self,
            StoreError::DocumentNotFound { .. } | StoreError::DocumentDeleted { .. }
        )
    }
}

/// Result alias used across all vellumdb crates.
pub type Result<T> = std::result::Result<T, StoreError>;
