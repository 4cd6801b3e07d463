//! Public transaction handle
//!
//! A `Transaction` pairs a buffered [`TransactionContext`] with store
//! access. Reads resolve through the write buffer first
//! (read-your-writes), then through MVCC visibility at the transaction's
//! snapshot timestamp. Writes accumulate in the buffer and are installed
//! atomically at commit under the store's registry write lock, together
//! with every index update.
//!
//! There is no conflict detection: commits are last-writer-wins per
//! document. Two overlapping read-write transactions touching the same
//! document overwrite each other without diagnostic; callers needing
//! optimistic concurrency must layer a version check above this API.

use crate::store::StoreInner;
use crate::stream::DocumentStream;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use vellum_concurrency::{Operation, TransactionContext, TransactionMode, TransactionStatus};
use vellum_core::{Document, DocumentId, Result, StoreError, Value};

/// A unit of interaction with the store.
///
/// Terminates through [`commit`](Transaction::commit) or
/// [`rollback`](Transaction::rollback); every operation afterwards fails
/// `TransactionClosed`. Dropping an open transaction rolls it back.
pub struct Transaction {
    store: Arc<StoreInner>,
    ctx: TransactionContext,
}

impl Transaction {
    pub(crate) fn new(store: Arc<StoreInner>, ctx: TransactionContext) -> Self {
        Transaction { store, ctx }
    }

    /// This transaction's unique id.
    pub fn id(&self) -> u64 {
        self.ctx.txn_id()
    }

    /// The access mode chosen at open.
    pub fn mode(&self) -> TransactionMode {
        self.ctx.mode()
    }

    /// The snapshot timestamp fixing this transaction's visibility
    /// horizon.
    pub fn snapshot_timestamp(&self) -> u64 {
        self.ctx.snapshot_ts()
    }

    /// Whether the transaction still accepts operations.
    pub fn is_open(&self) -> bool {
        self.ctx.is_open()
    }

    /// Create a document: generate an identifier, buffer a put, return
    /// the identifier. The document becomes visible to others only at
    /// commit.
    pub fn create(&mut self, data: Document) -> Result<DocumentId> {
        self.ctx.ensure_writable()?;
        self.store.ensure_open()?;
        let id = self.store.generate_id();
        self.ctx.stage_put(id.clone(), data);
        Ok(id)
    }

    /// Create a document from a JSON value, which must be an object.
    ///
    /// # Errors
    ///
    /// `InvalidData` when the value is not a JSON object.
    pub fn create_json(&mut self, data: serde_json::Value) -> Result<DocumentId> {
        self.create(document_from_json(data)?)
    }

    /// Replace a document's data. The target must resolve under this
    /// transaction's view (buffer included).
    pub fn update(&mut self, id: &str, data: Document) -> Result<()> {
        self.ctx.ensure_writable()?;
        self.read(id)?;
        self.ctx.stage_put(id.to_string(), data);
        Ok(())
    }

    /// Replace a document's data from a JSON object.
    pub fn update_json(&mut self, id: &str, data: serde_json::Value) -> Result<()> {
        self.update(id, document_from_json(data)?)
    }

    /// Buffer a deletion. The target must resolve under this
    /// transaction's view (buffer included).
    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.ctx.ensure_writable()?;
        self.read(id)?;
        self.ctx.stage_delete(id.to_string());
        Ok(())
    }

    /// Read a document under this transaction's view: the newest
    /// buffered write for the id wins, otherwise MVCC visibility at the
    /// snapshot timestamp decides. Returns a deep copy.
    pub fn read(&self, id: &str) -> Result<Document> {
        self.ctx.ensure_open()?;
        self.store.ensure_open()?;
        match self.ctx.pending_for(id) {
            Some(Operation::Put(data)) => Ok(data.clone()),
            Some(Operation::Delete) => Err(StoreError::DocumentDeleted { id: id.to_string() }),
            None => self
                .store
                .read_visible(id, self.ctx.txn_id(), self.ctx.snapshot_ts())
                .map(|(data, _)| data),
        }
    }

    /// Whether a document resolves under this transaction's view.
    pub fn exists(&self, id: &str) -> Result<bool> {
        match self.read(id) {
            Ok(_) => Ok(true),
            Err(e) if e.is_missing_document() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// All documents visible to this transaction, with buffered puts
    /// overlaid and buffered deletes removed. Deep copies throughout.
    pub fn read_all(&self) -> Result<HashMap<DocumentId, Document>> {
        self.ctx.ensure_open()?;
        self.store.ensure_open()?;
        let mut result = self
            .store
            .read_all_visible(self.ctx.txn_id(), self.ctx.snapshot_ts());
        for write in self.ctx.writes() {
            match &write.op {
                Operation::Put(data) => {
                    result.insert(write.id.clone(), data.clone());
                }
                Operation::Delete => {
                    result.remove(&write.id);
                }
            }
        }
        Ok(result)
    }

    /// Number of documents visible to this transaction.
    pub fn count(&self) -> Result<usize> {
        Ok(self.read_all()?.len())
    }

    /// Exact-match index query, filtered through this transaction's
    /// view. Candidates whose visible state no longer matches simply drop
    /// out; the caller always observes a consistent snapshot.
    pub fn find_by_index(
        &self,
        index_name: &str,
        values: &[Value],
    ) -> Result<HashMap<DocumentId, Document>> {
        self.ctx.ensure_open()?;
        let index = self.store.index_named(index_name)?;
        self.resolve_candidates(index.lookup(values))
    }

    /// Inclusive range index query, filtered through this transaction's
    /// view.
    pub fn find_by_range(
        &self,
        index_name: &str,
        min: &[Value],
        max: &[Value],
    ) -> Result<HashMap<DocumentId, Document>> {
        self.ctx.ensure_open()?;
        let index = self.store.index_named(index_name)?;
        self.resolve_candidates(index.lookup_range(min, max))
    }

    /// Prefix index query, filtered through this transaction's view.
    pub fn find_by_prefix(
        &self,
        index_name: &str,
        prefix: &[Value],
    ) -> Result<HashMap<DocumentId, Document>> {
        self.ctx.ensure_open()?;
        let index = self.store.index_named(index_name)?;
        self.resolve_candidates(index.lookup_prefix(prefix))
    }

    /// Number of documents matching an exact index query under this
    /// transaction's view.
    pub fn count_by_index(&self, index_name: &str, values: &[Value]) -> Result<usize> {
        Ok(self.find_by_index(index_name, values)?.len())
    }

    /// Stream the documents visible to this transaction, captured now.
    /// Buffered writes are not overlaid; the stream reflects committed
    /// state only.
    pub fn stream(&self, capacity: usize) -> Result<DocumentStream> {
        self.ctx.ensure_open()?;
        self.store.ensure_open()?;
        let snapshot = self
            .store
            .visible_results_ordered(self.ctx.txn_id(), self.ctx.snapshot_ts());
        Ok(DocumentStream::spawn(capacity, snapshot))
    }

    /// Commit: stamp every buffered write with one fresh commit
    /// timestamp and install them atomically, updating all indexes in
    /// the same critical section. Read-only transactions just close.
    ///
    /// On failure the transaction rolls back; no partial commit is ever
    /// observable.
    pub fn commit(&mut self) -> Result<()> {
        self.ctx.ensure_open()?;
        self.store.ensure_open()?;
        if self.ctx.mode() == TransactionMode::ReadWrite {
            let writes = self.ctx.drain_coalesced();
            if !writes.is_empty() {
                match self.store.apply_commit(self.ctx.txn_id(), &writes) {
                    Ok(commit_ts) => {
                        debug!(
                            txn_id = self.ctx.txn_id(),
                            writes = writes.len(),
                            commit_ts,
                            "transaction committed"
                        );
                    }
                    Err(e) => {
                        self.ctx.mark_rolled_back();
                        self.store.end_transaction(self.ctx.txn_id());
                        return Err(e);
                    }
                }
            }
        }
        self.ctx.mark_committed();
        self.store.end_transaction(self.ctx.txn_id());
        Ok(())
    }

    /// Discard the buffer and close. Idempotent: rolling back a closed
    /// transaction is a no-op.
    pub fn rollback(&mut self) {
        if !self.ctx.is_open() {
            return;
        }
        self.ctx.mark_rolled_back();
        self.store.end_transaction(self.ctx.txn_id());
    }

    fn resolve_candidates(
        &self,
        candidates: Vec<DocumentId>,
    ) -> Result<HashMap<DocumentId, Document>> {
        let mut result = HashMap::new();
        for id in candidates {
            if let Ok(data) = self.read(&id) {
                result.insert(id, data);
            }
        }
        Ok(result)
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.ctx.status() == TransactionStatus::Open {
            self.rollback();
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("txn_id", &self.ctx.txn_id())
            .field("mode", &self.ctx.mode())
            .field("status", &self.ctx.status())
            .field("buffered_writes", &self.ctx.writes().len())
            .finish()
    }
}

fn document_from_json(data: serde_json::Value) -> Result<Document> {
    match Value::from(data) {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::InvalidData),
    }
}
