//! Store facade: registries, lifecycle, commit application
//!
//! The store owns two registries behind one reader-writer lock: document
//! cells by identifier and field indexes by name. Transaction reads and
//! index queries take the lock shared; structural changes (installing a
//! new cell, creating or dropping an index) and commit application take
//! it exclusive, which is what makes a multi-document commit appear
//! atomic to every reader.
//!
//! Lock order is registry, then cell, then index; nothing acquires them
//! in any other order, so the hierarchy is cycle-free.

use crate::config::StoreConfig;
use crate::cursor::Cursor;
use crate::index::FieldIndex;
use crate::stream::DocumentStream;
use crate::transaction::Transaction;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use vellum_concurrency::{
    CommittedState, DocumentCell, Operation, TransactionManager, TransactionMode, WriteOp,
};
use vellum_core::{Document, DocumentId, DocumentResult, Result, StoreError};

/// Both registries, guarded together by the registry lock.
#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) documents: HashMap<DocumentId, Arc<DocumentCell>>,
    pub(crate) indexes: HashMap<String, Arc<FieldIndex>>,
}

/// Shared state behind every `Store`, `Transaction`, stream, and cursor
/// handle.
pub(crate) struct StoreInner {
    pub(crate) registry: RwLock<Registry>,
    pub(crate) manager: TransactionManager,
    ids: Arc<dyn vellum_core::IdProvider>,
    next_slot: AtomicU64,
    closed: AtomicBool,
}

impl StoreInner {
    /// Fail with `StoreClosed` once `close` has run.
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StoreError::StoreClosed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Fresh identifier from the injected provider.
    pub(crate) fn generate_id(&self) -> DocumentId {
        self.ids.generate()
    }

    /// Visibility-filtered read of a single document.
    pub(crate) fn read_visible(
        &self,
        id: &str,
        txn_id: u64,
        snapshot_ts: u64,
    ) -> Result<(Document, u64)> {
        self.ensure_open()?;
        let registry = self.registry.read();
        let cell = registry
            .documents
            .get(id)
            .ok_or_else(|| StoreError::DocumentNotFound { id: id.to_string() })?;
        cell.read_visible(txn_id, snapshot_ts)
    }

    /// Latest committed state of a document, independent of any
    /// transaction. Cursors materialize positions through this.
    pub(crate) fn latest_result(&self, id: &str) -> Result<DocumentResult> {
        self.ensure_open()?;
        let registry = self.registry.read();
        let cell = registry
            .documents
            .get(id)
            .ok_or_else(|| StoreError::DocumentNotFound { id: id.to_string() })?;
        match cell.latest_committed() {
            CommittedState::Present { data, revision } => Ok(DocumentResult {
                id: id.to_string(),
                data,
                revision,
            }),
            CommittedState::Deleted { .. } => {
                Err(StoreError::DocumentDeleted { id: id.to_string() })
            }
            CommittedState::Absent => Err(StoreError::DocumentNotFound { id: id.to_string() }),
        }
    }

    /// Every document visible to `(txn_id, snapshot_ts)`, keyed by id.
    pub(crate) fn read_all_visible(
        &self,
        txn_id: u64,
        snapshot_ts: u64,
    ) -> HashMap<DocumentId, Document> {
        let registry = self.registry.read();
        let mut out = HashMap::new();
        for (id, cell) in &registry.documents {
            if let Ok((data, _)) = cell.read_visible(txn_id, snapshot_ts) {
                out.insert(id.clone(), data);
            }
        }
        out
    }

    /// Every document visible to `(txn_id, snapshot_ts)`, in slot order.
    /// The registry lock is held for the whole capture, so the result is
    /// a consistent snapshot.
    pub(crate) fn visible_results_ordered(
        &self,
        txn_id: u64,
        snapshot_ts: u64,
    ) -> Vec<DocumentResult> {
        let registry = self.registry.read();
        let mut rows: Vec<(u64, DocumentResult)> = Vec::new();
        for (id, cell) in &registry.documents {
            if let Ok((data, revision)) = cell.read_visible(txn_id, snapshot_ts) {
                rows.push((
                    cell.slot(),
                    DocumentResult {
                        id: id.clone(),
                        data,
                        revision,
                    },
                ));
            }
        }
        rows.sort_by_key(|(slot, _)| *slot);
        rows.into_iter().map(|(_, result)| result).collect()
    }

    /// Latest committed documents (non-tombstone), in slot order.
    pub(crate) fn latest_results_ordered(&self) -> Vec<DocumentResult> {
        let registry = self.registry.read();
        let mut rows: Vec<(u64, DocumentResult)> = Vec::new();
        for (id, cell) in &registry.documents {
            if let CommittedState::Present { data, revision } = cell.latest_committed() {
                rows.push((
                    cell.slot(),
                    DocumentResult {
                        id: id.clone(),
                        data,
                        revision,
                    },
                ));
            }
        }
        rows.sort_by_key(|(slot, _)| *slot);
        rows.into_iter().map(|(_, result)| result).collect()
    }

    /// Look up a registered index by name.
    pub(crate) fn index_named(&self, name: &str) -> Result<Arc<FieldIndex>> {
        self.ensure_open()?;
        let registry = self.registry.read();
        registry
            .indexes
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::IndexNotFound {
                name: name.to_string(),
            })
    }

    /// Install one commit: every chain mutation and every index update
    /// happens under the registry write lock, so readers see all of the
    /// commit or none of it. The commit timestamp is drawn inside the
    /// lock; commits therefore install in timestamp order and every
    /// chain stays strictly decreasing.
    ///
    /// The write list arrives coalesced (one operation per document). A
    /// delete targeting a cell that does not exist can only mean the
    /// document was created and deleted inside the same transaction —
    /// staging verifies presence against the snapshot for every other
    /// path — so it installs a cell whose first version is the tombstone.
    ///
    /// Returns the commit timestamp.
    pub(crate) fn apply_commit(&self, txn_id: u64, writes: &[WriteOp]) -> Result<u64> {
        self.ensure_open()?;
        let mut registry = self.registry.write();
        let commit_ts = self.manager.commit_timestamp();
        for write in writes {
            let existing = registry.documents.get(&write.id).cloned();
            match &write.op {
                Operation::Put(data) => {
                    if let Some(cell) = existing {
                        let prev = cell.latest_committed();
                        cell.prepend(txn_id, commit_ts, data.clone(), false);
                        for index in registry.indexes.values() {
                            match &prev {
                                CommittedState::Present {
                                    data: prev_data, ..
                                } => {
                                    index.update_doc(&write.id, prev_data, data);
                                }
                                _ => {
                                    index.insert_doc(&write.id, data);
                                }
                            }
                        }
                    } else {
                        let slot = self.next_slot.fetch_add(1, Ordering::SeqCst);
                        let cell = Arc::new(DocumentCell::new(write.id.clone(), slot));
                        cell.prepend(txn_id, commit_ts, data.clone(), false);
                        registry.documents.insert(write.id.clone(), cell);
                        for index in registry.indexes.values() {
                            index.insert_doc(&write.id, data);
                        }
                    }
                }
                Operation::Delete => {
                    if let Some(cell) = existing {
                        let prev = cell.latest_committed();
                        cell.prepend(txn_id, commit_ts, Document::new(), true);
                        if let CommittedState::Present {
                            data: prev_data, ..
                        } = prev
                        {
                            for index in registry.indexes.values() {
                                index.delete_doc(&write.id, &prev_data);
                            }
                        }
                    } else {
                        // Created and deleted within one transaction: the
                        // cell's first version is the tombstone.
                        let slot = self.next_slot.fetch_add(1, Ordering::SeqCst);
                        let cell = Arc::new(DocumentCell::new(write.id.clone(), slot));
                        cell.prepend(txn_id, commit_ts, Document::new(), true);
                        registry.documents.insert(write.id.clone(), cell);
                    }
                }
            }
        }
        Ok(commit_ts)
    }

    /// Deregister a transaction and opportunistically collect garbage.
    pub(crate) fn end_transaction(&self, txn_id: u64) {
        self.manager.end(txn_id);
        self.maybe_collect_garbage();
    }

    /// Rate-limited version-chain pruning. Indexes are never touched:
    /// they track the latest committed state, which pruning always
    /// retains.
    fn maybe_collect_garbage(&self) {
        if self.is_closed() || !self.manager.should_collect() {
            return;
        }
        let threshold = self.manager.gc_threshold();
        let registry = self.registry.read();
        let mut pruned = 0usize;
        for cell in registry.documents.values() {
            pruned += cell.prune_older_than(threshold);
        }
        if pruned > 0 {
            debug!(pruned, threshold, "pruned obsolete document versions");
        }
    }
}

/// Embedded, in-process, in-memory document store.
///
/// `Store` is a cheap handle; clones share the same state, so a store can
/// be handed to any number of threads. All public operations are
/// thread-safe. Data is volatile: dropping the last handle discards
/// everything.
///
/// # Example
///
/// ```
/// use vellum_engine::{Store, TransactionMode};
/// use vellum_core::{Document, Value};
///
/// let store = Store::new();
/// let mut txn = store.open_transaction(TransactionMode::ReadWrite).unwrap();
/// let mut doc = Document::new();
/// doc.insert("title".to_string(), Value::String("A".into()));
/// let id = txn.create(doc).unwrap();
/// txn.commit().unwrap();
///
/// let reader = store.open_transaction(TransactionMode::ReadOnly).unwrap();
/// let data = reader.read(&id).unwrap();
/// assert_eq!(data["title"], Value::String("A".into()));
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Create a store with default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create a store with explicit configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        Store {
            inner: Arc::new(StoreInner {
                registry: RwLock::new(Registry::default()),
                manager: TransactionManager::new(config.gc_interval),
                ids: config.id_provider,
                next_slot: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Open a transaction in the given mode.
    ///
    /// The snapshot timestamp is captured here and fixes the
    /// transaction's visibility horizon for its whole life.
    pub fn open_transaction(&self, mode: TransactionMode) -> Result<Transaction> {
        self.inner.ensure_open()?;
        let ctx = self.inner.manager.begin(mode);
        debug!(txn_id = ctx.txn_id(), ?mode, "transaction opened");
        Ok(Transaction::new(Arc::clone(&self.inner), ctx))
    }

    /// Latest committed state of a document, outside any transaction.
    pub fn get(&self, id: &str) -> Result<DocumentResult> {
        self.inner.latest_result(id)
    }

    /// Create a field index over `fields` (in declaration order) and
    /// backfill it from the latest committed state of every document.
    pub fn create_index(&self, name: &str, fields: &[&str]) -> Result<()> {
        self.inner.ensure_open()?;
        if fields.is_empty() {
            return Err(StoreError::EmptyIndex);
        }
        let mut registry = self.inner.registry.write();
        if registry.indexes.contains_key(name) {
            return Err(StoreError::IndexExists {
                name: name.to_string(),
            });
        }
        let index = FieldIndex::new(
            name.to_string(),
            fields.iter().map(|f| f.to_string()).collect(),
        );
        let mut indexed = 0usize;
        for cell in registry.documents.values() {
            if let CommittedState::Present { data, .. } = cell.latest_committed() {
                if index.insert_doc(cell.id(), &data) {
                    indexed += 1;
                }
            }
        }
        registry.indexes.insert(name.to_string(), Arc::new(index));
        info!(index = name, documents = indexed, "field index created");
        Ok(())
    }

    /// Remove an index from the registry.
    pub fn drop_index(&self, name: &str) -> Result<()> {
        self.inner.ensure_open()?;
        let mut registry = self.inner.registry.write();
        if registry.indexes.remove(name).is_none() {
            return Err(StoreError::IndexNotFound {
                name: name.to_string(),
            });
        }
        info!(index = name, "field index dropped");
        Ok(())
    }

    /// Names of all registered indexes, sorted.
    pub fn list_indexes(&self) -> Result<Vec<String>> {
        self.inner.ensure_open()?;
        let registry = self.inner.registry.read();
        let mut names: Vec<String> = registry.indexes.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Stream of the latest committed documents, captured now.
    ///
    /// `capacity` bounds the producer-consumer buffer; zero means a
    /// rendezvous handoff.
    pub fn stream(&self, capacity: usize) -> Result<DocumentStream> {
        self.inner.ensure_open()?;
        let snapshot = self.inner.latest_results_ordered();
        Ok(DocumentStream::spawn(capacity, snapshot))
    }

    /// Bidirectional cursor over all documents, in insertion (slot)
    /// order. The id list is the snapshot; data is materialized from the
    /// latest committed state on access.
    pub fn cursor(&self) -> Result<Cursor> {
        self.inner.ensure_open()?;
        let registry = self.inner.registry.read();
        let mut rows: Vec<(u64, DocumentId)> = registry
            .documents
            .values()
            .filter(|cell| matches!(cell.latest_committed(), CommittedState::Present { .. }))
            .map(|cell| (cell.slot(), cell.id().to_string()))
            .collect();
        drop(registry);
        rows.sort_by_key(|(slot, _)| *slot);
        let ids: Vec<DocumentId> = rows.into_iter().map(|(_, id)| id).collect();
        Ok(Cursor::new(Arc::clone(&self.inner), ids))
    }

    /// Bidirectional cursor over the members of an index, in ascending
    /// key order (ties within one key in slot order).
    pub fn cursor_by_index(&self, name: &str) -> Result<Cursor> {
        self.inner.ensure_open()?;
        let registry = self.inner.registry.read();
        let index = registry
            .indexes
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::IndexNotFound {
                name: name.to_string(),
            })?;
        let mut ids: Vec<DocumentId> = Vec::new();
        for (_, mut members) in index.snapshot_entries() {
            members.sort_by_key(|id| {
                registry
                    .documents
                    .get(id)
                    .map(|cell| cell.slot())
                    .unwrap_or(u64::MAX)
            });
            ids.extend(members);
        }
        drop(registry);
        Ok(Cursor::new(Arc::clone(&self.inner), ids))
    }

    /// Shut the store down: all subsequent operations fail `StoreClosed`
    /// and both registries are released.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut registry = self.inner.registry.write();
        registry.documents.clear();
        registry.indexes.clear();
        info!("store closed");
    }

    /// Whether `close` has run.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
