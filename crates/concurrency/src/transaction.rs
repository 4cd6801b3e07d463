//! Transaction context: buffered writes and the lifecycle state machine
//!
//! A transaction buffers its writes locally and applies them all at once
//! at commit. Nothing in the buffer is visible to other transactions; the
//! owning transaction sees its own buffer first (read-your-writes) by
//! scanning it backwards, newest staged write first.
//!
//! ## Lifecycle
//!
//! `Open → Committed | RolledBack`. Both terminal states reject every
//! further operation with `TransactionClosed`.

use vellum_core::{Document, DocumentId, Result, StoreError};

/// Access mode chosen when the transaction is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Reads only; every mutation fails `ReadOnlyTransaction`.
    ReadOnly,
    /// Reads and buffered writes.
    ReadWrite,
}

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Accepting operations.
    Open,
    /// Terminal: commit completed.
    Committed,
    /// Terminal: rolled back (explicitly or after a failed commit).
    RolledBack,
}

/// A buffered mutation.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Install this data as the document's new state.
    Put(Document),
    /// Install a tombstone.
    Delete,
}

/// One entry in a transaction's write buffer, in staging order.
#[derive(Debug, Clone)]
pub struct WriteOp {
    /// Target document.
    pub id: DocumentId,
    /// What to do to it.
    pub op: Operation,
}

/// Buffered state of a single transaction.
///
/// The context is the engine-internal half of a transaction: it owns the
/// identifiers, the snapshot timestamp, and the write buffer, but knows
/// nothing about the store. The engine's transaction handle pairs it with
/// store access.
#[derive(Debug)]
pub struct TransactionContext {
    txn_id: u64,
    snapshot_ts: u64,
    mode: TransactionMode,
    writes: Vec<WriteOp>,
    status: TransactionStatus,
}

impl TransactionContext {
    /// Create an open context. Called by the transaction manager, which
    /// allocates the id and draws the snapshot timestamp.
    pub fn new(txn_id: u64, snapshot_ts: u64, mode: TransactionMode) -> Self {
        TransactionContext {
            txn_id,
            snapshot_ts,
            mode,
            writes: Vec::new(),
            status: TransactionStatus::Open,
        }
    }

    /// Unique transaction id.
    pub fn txn_id(&self) -> u64 {
        self.txn_id
    }

    /// Snapshot timestamp captured at open; never changes.
    pub fn snapshot_ts(&self) -> u64 {
        self.snapshot_ts
    }

    /// Access mode.
    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    /// Current lifecycle state.
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Whether the transaction still accepts operations.
    pub fn is_open(&self) -> bool {
        self.status == TransactionStatus::Open
    }

    /// Fail with `TransactionClosed` unless open.
    pub fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StoreError::TransactionClosed)
        }
    }

    /// Fail unless open and read-write.
    pub fn ensure_writable(&self) -> Result<()> {
        self.ensure_open()?;
        if self.mode == TransactionMode::ReadWrite {
            Ok(())
        } else {
            Err(StoreError::ReadOnlyTransaction)
        }
    }

    /// Buffer a put. Caller has already validated mode and presence.
    pub fn stage_put(&mut self, id: DocumentId, data: Document) {
        self.writes.push(WriteOp {
            id,
            op: Operation::Put(data),
        });
    }

    /// Buffer a delete.
    pub fn stage_delete(&mut self, id: DocumentId) {
        self.writes.push(WriteOp {
            id,
            op: Operation::Delete,
        });
    }

    /// Newest buffered operation for `id`, if any (read-your-writes).
    pub fn pending_for(&self, id: &str) -> Option<&Operation> {
        self.writes.iter().rev().find(|w| w.id == id).map(|w| &w.op)
    }

    /// All buffered writes in staging order.
    pub fn writes(&self) -> &[WriteOp] {
        &self.writes
    }

    /// Drain the buffer coalesced to one write per document.
    ///
    /// Later writes to the same document supersede earlier ones, so a
    /// commit installs at most one version per cell and chains stay
    /// strictly decreasing in commit time. First-touch order is kept so
    /// the commit applies documents in the order the transaction first
    /// wrote them.
    pub fn drain_coalesced(&mut self) -> Vec<WriteOp> {
        let staged = std::mem::take(&mut self.writes);
        let mut order: Vec<DocumentId> = Vec::new();
        let mut latest: std::collections::HashMap<DocumentId, Operation> =
            std::collections::HashMap::new();
        for write in staged {
            if !latest.contains_key(&write.id) {
                order.push(write.id.clone());
            }
            latest.insert(write.id, write.op);
        }
        order
            .into_iter()
            .map(|id| {
                let op = latest.remove(&id).expect("id recorded on first touch");
                WriteOp { id, op }
            })
            .collect()
    }

    /// Transition to `Committed`.
    pub fn mark_committed(&mut self) {
        debug_assert!(self.is_open());
        self.status = TransactionStatus::Committed;
    }

    /// Transition to `RolledBack`. Discards any remaining buffer.
    pub fn mark_rolled_back(&mut self) {
        self.writes.clear();
        self.status = TransactionStatus::RolledBack;
    }
}
