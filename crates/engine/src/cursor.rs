//! Bidirectional, seekable document cursors
//!
//! A cursor snapshots an ordered list of document identifiers at
//! construction; the list never changes afterwards. Data is materialized
//! lazily: each access reads the document's latest committed state, so a
//! document deleted after the cursor was opened reports
//! `DocumentDeleted` at its position while the cursor advances normally.
//!
//! `clone` shares the snapshot but iterates independently, which makes
//! nested passes over the same view cheap.

use crate::store::StoreInner;
use std::sync::Arc;
use vellum_core::{DocumentId, DocumentResult, Result, StoreError};

/// A document yielded by a cursor, with a direction-sensitive hint
/// whether more positions remain.
#[derive(Debug, Clone)]
pub struct CursorEntry {
    /// The materialized document.
    pub document: DocumentResult,
    /// Whether another position exists in the direction of travel.
    pub has_more: bool,
}

/// Random-access iterator over a snapshot of document identifiers.
pub struct Cursor {
    store: Arc<StoreInner>,
    ids: Option<Arc<[DocumentId]>>,
    position: usize,
}

impl Cursor {
    pub(crate) fn new(store: Arc<StoreInner>, ids: Vec<DocumentId>) -> Self {
        Cursor {
            store,
            ids: Some(ids.into()),
            position: 0,
        }
    }

    /// Return the document at the current position and advance by one.
    ///
    /// At the end of the snapshot, returns `Ok(None)` and stays there.
    /// A position whose document has since been deleted yields
    /// `DocumentDeleted` and still advances.
    pub fn next(&mut self) -> Result<Option<CursorEntry>> {
        let ids = self.snapshot()?;
        if self.position >= ids.len() {
            return Ok(None);
        }
        let resolved = self.materialize(&ids[self.position]);
        self.position += 1;
        let has_more = self.position < ids.len();
        resolved.map(|document| Some(CursorEntry { document, has_more }))
    }

    /// Step back one position; identical to `advance(-1)`.
    pub fn previous(&mut self) -> Result<Option<CursorEntry>> {
        self.advance(-1)
    }

    /// Reposition by `count` (negative moves backwards), clamped to the
    /// snapshot bounds, and return the document at the new position. The
    /// `has_more` hint follows the direction of travel.
    pub fn advance(&mut self, count: i64) -> Result<Option<CursorEntry>> {
        let ids = self.snapshot()?;
        if ids.is_empty() {
            return Ok(None);
        }
        let last = ids.len() as i64 - 1;
        let target = (self.position as i64 + count).clamp(0, last);
        self.position = target as usize;
        let has_more = if count >= 0 {
            target < last
        } else {
            target > 0
        };
        let document = self.materialize(&ids[self.position])?;
        Ok(Some(CursorEntry { document, has_more }))
    }

    /// Return to the first position.
    pub fn reset(&mut self) -> Result<()> {
        self.snapshot()?;
        self.position = 0;
        Ok(())
    }

    /// Number of identifiers in the snapshot; 0 once closed.
    pub fn count(&self) -> usize {
        self.ids.as_ref().map_or(0, |ids| ids.len())
    }

    /// Release the snapshot. Subsequent operations fail `StreamClosed`.
    pub fn close(&mut self) {
        self.ids = None;
    }

    fn snapshot(&self) -> Result<Arc<[DocumentId]>> {
        self.ids.clone().ok_or(StoreError::StreamClosed)
    }

    fn materialize(&self, id: &str) -> Result<DocumentResult> {
        match self.store.latest_result(id) {
            Ok(result) => Ok(result),
            Err(StoreError::StoreClosed) => Err(StoreError::StoreClosed),
            // The id existed when the snapshot was taken; any failure to
            // resolve now means it was removed in the meantime.
            Err(_) => Err(StoreError::DocumentDeleted { id: id.to_string() }),
        }
    }
}

/// A cloned cursor shares the snapshot but iterates independently.
/// Cloning a closed cursor yields a closed cursor.
impl Clone for Cursor {
    fn clone(&self) -> Self {
        Cursor {
            store: Arc::clone(&self.store),
            ids: self.ids.clone(),
            position: self.position,
        }
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("position", &self.position)
            .field("count", &self.count())
            .field("closed", &self.ids.is_none())
            .finish()
    }
}
