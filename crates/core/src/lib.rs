//! Core types for vellumdb
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: tagged value enum for schemaless document fields
//! - Document / DocumentId: the unit of storage and its opaque identifier
//! - IndexKey and the total value ordering used by field indexes
//! - StoreError: the unified error taxonomy for all public APIs
//! - IdProvider: injectable document identifier generation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod ident;
pub mod ordering;
pub mod value;

pub use document::{Document, DocumentId, DocumentResult};
pub use error::{Result, StoreError};
pub use ident::{IdProvider, UuidProvider};
pub use ordering::{compare_composite, compare_values, IndexKey};
pub use value::Value;
