//! Total ordering over heterogeneous values and composite index keys
//!
//! Field indexes are ordered trees; their keys mix value types because the
//! data model is schemaless. This module defines the single total order
//! those trees use, applied in this sequence:
//!
//! 1. Two nulls are equal.
//! 2. Null orders before everything else.
//! 3. Two numerics (`Int` or `Float`) compare as f64.
//! 4. Two values of the same type compare by that type's natural order
//!    (strings bytewise, `false < true`); arrays and objects fall through
//!    to rule 6.
//! 5. Values of different types compare by their [`Value::type_label`].
//! 6. Fallback: compare deterministic textual renderings.
//!
//! Composite keys compare element by element, left to right; a strict
//! prefix orders before its extensions. The order is total by
//! construction, so key comparison never fails.

use crate::value::Value;
use std::cmp::Ordering;

/// Compare two values under the index total order.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => {
            if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
                return compare_f64(x, y);
            }
            match (a, b) {
                (Value::String(x), Value::String(y)) => x.cmp(y),
                (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                _ if a.type_label() != b.type_label() => a.type_label().cmp(b.type_label()),
                // Same-type arrays / objects: deterministic rendering
                _ => a.to_string().cmp(&b.to_string()),
            }
        }
    }
}

/// Compare two composite keys element-wise; a strict prefix orders first.
pub fn compare_composite(a: &[Value], b: &[Value]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match compare_values(x, y) {
            Ordering::Equal => continue,
            non_eq => return non_eq,
        }
    }
    a.len().cmp(&b.len())
}

/// f64 comparison made total: NaN compares equal to NaN and greater than
/// every other value, mirroring the IEEE total-order placement of
/// positive NaN.
fn compare_f64(x: f64, y: f64) -> Ordering {
    x.partial_cmp(&y)
        .unwrap_or_else(|| x.is_nan().cmp(&y.is_nan()))
}

/// Composite key for a field index entry
///
/// Wraps the ordered tuple of values extracted from a document's declared
/// fields. `Ord` delegates to [`compare_composite`], which makes the std
/// `BTreeMap` the index tree. Note that `Eq` here follows the total order,
/// not value equality: `Int(1)` and `Float(1.0)` produce equal keys and
/// share one index entry.
#[derive(Debug, Clone)]
pub struct IndexKey(Vec<Value>);

impl IndexKey {
    /// Wrap an extracted value tuple as a key.
    pub fn new(values: Vec<Value>) -> Self {
        IndexKey(values)
    }

    /// The key's components in declaration order.
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the key has no components.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this key begins with `prefix`, element for element, under
    /// the index order's notion of equality.
    pub fn starts_with(&self, prefix: &[Value]) -> bool {
        self.0.len() >= prefix.len()
            && self
                .0
                .iter()
                .zip(prefix.iter())
                .all(|(a, b)| compare_values(a, b) == Ordering::Equal)
    }
}

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        compare_composite(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for IndexKey {}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_composite(&self.0, &other.0)
    }
}

impl From<Vec<Value>> for IndexKey {
    fn from(values: Vec<Value>) -> Self {
        IndexKey::new(values)
    }
}
