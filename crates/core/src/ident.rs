//! Document identifier generation
//!
//! Identifier generation is an injected collaborator: the store asks an
//! [`IdProvider`] for a fresh unique string whenever a transaction stages
//! a create. The default provider emits UUID v7 strings, which are
//! time-ordered and therefore double as a rough insertion-order proxy.

use crate::document::DocumentId;
use uuid::Uuid;

/// Source of process-unique document identifiers.
///
/// Implementations must return a distinct string on every call for the
/// lifetime of the process. Identifiers are opaque to the store; nothing
/// inspects their contents.
pub trait IdProvider: Send + Sync {
    /// Produce a fresh, unique identifier.
    fn generate(&self) -> DocumentId;
}

/// Default identifier provider: UUID version 7.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate(&self) -> DocumentId {
        Uuid::now_v7().to_string()
    }
}
