//! B-tree field indexes
//!
//! A field index declares an ordered list of field names and maps the
//! composite key extracted from those fields to the set of document ids
//! whose latest committed state carries that key. The tree is a std
//! `BTreeMap` ordered by the total value ordering in
//! [`vellum_core::ordering`].
//!
//! A document is indexable iff every declared field is present with a
//! scalar, non-null value; otherwise the index skips it entirely. Entries
//! with empty member sets are removed, so an entry's presence implies at
//! least one member.
//!
//! The index has its own lock and never takes the store registry lock;
//! the engine acquires registry, then cell, then index, in that order.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use vellum_core::{compare_composite, Document, DocumentId, IndexKey, Value};

/// Ordered secondary index over one or more document fields.
#[derive(Debug)]
pub struct FieldIndex {
    name: String,
    fields: Vec<String>,
    tree: RwLock<BTreeMap<IndexKey, HashSet<DocumentId>>>,
}

impl FieldIndex {
    /// Create an empty index over `fields`, in declaration order.
    pub fn new(name: String, fields: Vec<String>) -> Self {
        FieldIndex {
            name,
            fields,
            tree: RwLock::new(BTreeMap::new()),
        }
    }

    /// The index's registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields in key order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Extract the composite key for `data`, or `None` when the document
    /// is not indexable under this index (a declared field is absent,
    /// null, or a container).
    pub fn extract(&self, data: &Document) -> Option<IndexKey> {
        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            match data.get(field) {
                Some(value) if value.is_indexable() => values.push(value.clone()),
                _ => return None,
            }
        }
        Some(IndexKey::new(values))
    }

    /// Add a document. Returns true iff the document is now indexed.
    pub fn insert_doc(&self, id: &str, data: &Document) -> bool {
        let Some(key) = self.extract(data) else {
            return false;
        };
        let mut tree = self.tree.write();
        tree.entry(key).or_default().insert(id.to_string());
        true
    }

    /// Move a document between entries after an update.
    ///
    /// When the extracted key is unchanged (including "unindexable before
    /// and after"), this is a no-op. Returns true iff the document is
    /// indexed before or after the update.
    pub fn update_doc(&self, id: &str, prev_data: &Document, new_data: &Document) -> bool {
        let old_key = self.extract(prev_data);
        let new_key = self.extract(new_data);
        if old_key == new_key {
            return old_key.is_some();
        }
        let mut tree = self.tree.write();
        if let Some(key) = old_key {
            remove_member(&mut tree, &key, id);
        }
        if let Some(key) = new_key {
            tree.entry(key).or_default().insert(id.to_string());
        }
        // Keys differ, so at least one side was indexable.
        true
    }

    /// Remove a document. Returns true iff it was indexed.
    pub fn delete_doc(&self, id: &str, data: &Document) -> bool {
        let Some(key) = self.extract(data) else {
            return false;
        };
        let mut tree = self.tree.write();
        remove_member(&mut tree, &key, id);
        true
    }

    /// Exact-match lookup. A query whose arity differs from the declared
    /// field count can match nothing and returns empty.
    pub fn lookup(&self, values: &[Value]) -> Vec<DocumentId> {
        if values.len() != self.fields.len() {
            return Vec::new();
        }
        let key = IndexKey::new(values.to_vec());
        let tree = self.tree.read();
        tree.get(&key)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Inclusive range lookup: every id under a key `K` with
    /// `min <= K <= max`. Empty when `min > max`.
    pub fn lookup_range(&self, min: &[Value], max: &[Value]) -> Vec<DocumentId> {
        if compare_composite(min, max) == std::cmp::Ordering::Greater {
            return Vec::new();
        }
        let lo = IndexKey::new(min.to_vec());
        let hi = IndexKey::new(max.to_vec());
        let tree = self.tree.read();
        tree.range((Bound::Included(lo), Bound::Included(hi)))
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect()
    }

    /// Prefix lookup: every id under a key that begins with `prefix`,
    /// element for element. A prefix longer than the declared field list
    /// can match nothing and returns empty.
    pub fn lookup_prefix(&self, prefix: &[Value]) -> Vec<DocumentId> {
        if prefix.len() > self.fields.len() {
            return Vec::new();
        }
        let start = IndexKey::new(prefix.to_vec());
        let tree = self.tree.read();
        // Keys sharing the prefix form a contiguous run starting at the
        // prefix itself.
        tree.range((Bound::Included(start), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect()
    }

    /// All entries in ascending key order, for index-ordered cursors.
    pub fn snapshot_entries(&self) -> Vec<(IndexKey, Vec<DocumentId>)> {
        let tree = self.tree.read();
        tree.iter()
            .map(|(key, ids)| (key.clone(), ids.iter().cloned().collect()))
            .collect()
    }

    /// Number of distinct keys currently in the tree.
    pub fn entry_count(&self) -> usize {
        self.tree.read().len()
    }
}

fn remove_member(
    tree: &mut BTreeMap<IndexKey, HashSet<DocumentId>>,
    key: &IndexKey,
    id: &str,
) {
    if let Some(ids) = tree.get_mut(key) {
        ids.remove(id);
        if ids.is_empty() {
            tree.remove(key);
        }
    }
}
