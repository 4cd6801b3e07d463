//! Document types
//!
//! A document is an unordered mapping from field names to [`Value`]s,
//! addressed by an opaque process-unique identifier. `Value` owns its
//! entire tree, so `Clone` on a document is a structural deep copy; every
//! API boundary clones so callers can never mutate stored state through a
//! returned document.

use crate::value::Value;
use std::collections::HashMap;

/// Opaque, process-unique document identifier.
///
/// Produced by an [`crate::ident::IdProvider`]; callers must not parse or
/// synthesize identifiers.
pub type DocumentId = String;

/// Schemaless document data: field name to value.
pub type Document = HashMap<String, Value>;

/// A document together with its identity and revision, as yielded by
/// streams, cursors, and direct store reads.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentResult {
    /// The document's identifier.
    pub id: DocumentId,
    /// Deep copy of the document data.
    pub data: Document,
    /// 1-based count of committed versions this document has had;
    /// increases by one with every committed put or delete.
    pub revision: u64,
}
