//! Per-document MVCC version chain
//!
//! Each document lives in a [`DocumentCell`]: an identifier, a stable
//! slot (insertion-order proxy), and a singly linked chain of immutable
//! versions, newest first. Writers prepend; readers walk the chain and
//! take the first version their snapshot may see. The chain is acyclic by
//! construction and the cell exclusively owns it, so pruning a suffix
//! makes the discarded versions unreachable and reclaimable.
//!
//! ## Visibility
//!
//! A version is visible to a reader `(txn_id, snapshot_ts)` when:
//! - the reader's own transaction created it (read-your-writes), or
//! - it is committed (`committed_at > 0`) strictly before `snapshot_ts`.
//!
//! An uncommitted version (`committed_at == 0`) is visible only to its
//! creating transaction.

use parking_lot::RwLock;
use vellum_core::{Document, DocumentId, Result, StoreError};

/// One immutable version of a document.
#[derive(Debug)]
pub struct DocumentVersion {
    /// Transaction that created this version.
    pub created_by_txn: u64,
    /// Commit timestamp; `0` marks a pending version.
    pub committed_at: u64,
    /// 1-based ordinal of this version within its cell.
    pub revision: u64,
    /// Document data; empty for tombstones.
    pub data: Document,
    /// Whether this version marks a deletion.
    pub tombstone: bool,
    next: Option<Box<DocumentVersion>>,
}

impl DocumentVersion {
    /// Visibility predicate for a reader with the given transaction id
    /// and snapshot timestamp.
    pub fn is_visible_to(&self, txn_id: u64, snapshot_ts: u64) -> bool {
        if self.created_by_txn == txn_id {
            return true;
        }
        if self.committed_at == 0 {
            return false;
        }
        self.committed_at < snapshot_ts
    }
}

/// Latest committed state of a cell, as used for index maintenance and
/// snapshot-free reads.
#[derive(Debug, Clone, PartialEq)]
pub enum CommittedState {
    /// No committed version exists yet.
    Absent,
    /// The newest committed version is a tombstone.
    Deleted {
        /// Revision of the tombstone version.
        revision: u64,
    },
    /// The newest committed version carries data.
    Present {
        /// Deep copy of the version's data.
        data: Document,
        /// Revision of that version.
        revision: u64,
    },
}

/// Container of a single document's full version history.
#[derive(Debug)]
pub struct DocumentCell {
    id: DocumentId,
    slot: u64,
    chain: RwLock<Option<Box<DocumentVersion>>>,
}

impl DocumentCell {
    /// Create an empty cell. The first `prepend` installs its initial
    /// version.
    pub fn new(id: DocumentId, slot: u64) -> Self {
        DocumentCell {
            id,
            slot,
            chain: RwLock::new(None),
        }
    }

    /// The document identifier this cell holds history for.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stable creation-order slot; the all-documents cursor orders by it.
    pub fn slot(&self) -> u64 {
        self.slot
    }

    /// Resolve the version visible to `(txn_id, snapshot_ts)` and return
    /// a deep copy of its data with its revision.
    ///
    /// # Errors
    ///
    /// `DocumentDeleted` if the visible version is a tombstone,
    /// `DocumentNotFound` if no version is visible.
    pub fn read_visible(&self, txn_id: u64, snapshot_ts: u64) -> Result<(Document, u64)> {
        let chain = self.chain.read();
        let mut version = chain.as_deref();
        while let Some(v) = version {
            if v.is_visible_to(txn_id, snapshot_ts) {
                if v.tombstone {
                    return Err(StoreError::DocumentDeleted {
                        id: self.id.clone(),
                    });
                }
                return Ok((v.data.clone(), v.revision));
            }
            version = v.next.as_deref();
        }
        Err(StoreError::DocumentNotFound {
            id: self.id.clone(),
        })
    }

    /// The newest committed state, ignoring snapshots and pending
    /// versions. Index maintenance and cursor materialization read this.
    pub fn latest_committed(&self) -> CommittedState {
        let chain = self.chain.read();
        let mut version = chain.as_deref();
        while let Some(v) = version {
            if v.committed_at != 0 {
                return if v.tombstone {
                    CommittedState::Deleted {
                        revision: v.revision,
                    }
                } else {
                    CommittedState::Present {
                        data: v.data.clone(),
                        revision: v.revision,
                    }
                };
            }
            version = v.next.as_deref();
        }
        CommittedState::Absent
    }

    /// Prepend a new version as the chain head.
    ///
    /// The caller supplies the commit timestamp; timestamps must be
    /// strictly greater than every timestamp already in the chain, which
    /// the engine guarantees by drawing them from one monotonic clock.
    pub fn prepend(&self, created_by_txn: u64, committed_at: u64, data: Document, tombstone: bool) {
        let mut chain = self.chain.write();
        let revision = chain.as_deref().map_or(1, |head| head.revision + 1);
        let version = DocumentVersion {
            created_by_txn,
            committed_at,
            revision,
            data,
            tombstone,
            next: chain.take(),
        };
        *chain = Some(Box::new(version));
    }

    /// Truncate history that no active reader can still see.
    ///
    /// Walks newest-first and keeps everything up to and including the
    /// first committed version strictly older than `threshold`; that
    /// boundary version is exactly the one a reader whose snapshot equals
    /// the threshold resolves, so it must survive. Everything after it is
    /// unlinked. Returns the number of versions removed.
    pub fn prune_older_than(&self, threshold: u64) -> usize {
        let mut chain = self.chain.write();
        let Some(head) = chain.as_deref_mut() else {
            return 0;
        };
        let mut cursor = head;
        loop {
            if cursor.committed_at != 0 && cursor.committed_at < threshold {
                return chain_len(cursor.next.take());
            }
            match cursor.next.as_deref_mut() {
                Some(next) => cursor = next,
                None => return 0,
            }
        }
    }

    /// Number of versions currently in the chain.
    pub fn depth(&self) -> usize {
        let chain = self.chain.read();
        let mut n = 0;
        let mut version = chain.as_deref();
        while let Some(v) = version {
            n += 1;
            version = v.next.as_deref();
        }
        n
    }

    /// Commit timestamps newest-first, for invariant checks.
    pub fn committed_timestamps(&self) -> Vec<u64> {
        let chain = self.chain.read();
        let mut out = Vec::new();
        let mut version = chain.as_deref();
        while let Some(v) = version {
            if v.committed_at != 0 {
                out.push(v.committed_at);
            }
            version = v.next.as_deref();
        }
        out
    }
}

/// Box chains drop recursively by default; a chain that grew deep
/// between GC sweeps would overflow the stack. Unlink iteratively.
impl Drop for DocumentCell {
    fn drop(&mut self) {
        let mut link = self.chain.get_mut().take();
        while let Some(mut version) = link {
            link = version.next.take();
        }
    }
}

fn chain_len(mut link: Option<Box<DocumentVersion>>) -> usize {
    let mut n = 0;
    while let Some(v) = link {
        n += 1;
        link = v.next;
    }
    n
}
