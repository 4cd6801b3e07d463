//! Forward-only document streams
//!
//! A stream captures its snapshot (the materialized visible document
//! list) at construction and drives it through a bounded channel from a
//! producer thread. `next` blocks while the channel is empty and the
//! producer is still running; capacity zero makes every handoff a
//! rendezvous.
//!
//! Cancellation: `close` drops the cancellation channel's sender. The
//! producer `select!`s between sending the next document and observing
//! that disconnect, so a producer blocked on a full buffer unblocks
//! promptly and exits. Once closed, pending and future `next` calls
//! return `None` even if documents were still buffered.

use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::trace;
use vellum_core::DocumentResult;

/// Snapshot-backed, cancellable stream of documents.
#[derive(Debug)]
pub struct DocumentStream {
    results: Receiver<DocumentResult>,
    cancel: Mutex<Option<Sender<()>>>,
    closed: AtomicBool,
}

impl DocumentStream {
    /// Spawn a producer over an already-materialized snapshot.
    pub(crate) fn spawn(capacity: usize, snapshot: Vec<DocumentResult>) -> Self {
        let (results_tx, results_rx) = bounded(capacity);
        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        thread::spawn(move || {
            let total = snapshot.len();
            let mut sent = 0usize;
            for document in snapshot {
                select! {
                    send(results_tx, document) -> outcome => {
                        if outcome.is_err() {
                            break;
                        }
                        sent += 1;
                    }
                    recv(cancel_rx) -> _ => break,
                }
            }
            trace!(sent, total, "stream producer finished");
        });
        DocumentStream {
            results: results_rx,
            cancel: Mutex::new(Some(cancel_tx)),
            closed: AtomicBool::new(false),
        }
    }

    /// Next document in the stream, or `None` at end-of-stream or after
    /// cancellation. Blocks while the stream is live but momentarily
    /// empty.
    pub fn next(&self) -> Option<DocumentResult> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }
        match self.results.recv() {
            // A document may still have been in flight when close ran;
            // honor the cancellation over the buffered value.
            Ok(document) => {
                if self.closed.load(Ordering::SeqCst) {
                    None
                } else {
                    Some(document)
                }
            }
            Err(_) => None,
        }
    }

    /// Cancel the stream: the producer stops, blocked `next` calls
    /// unblock, and every subsequent `next` returns `None`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        // Dropping the sender disconnects the producer's cancel arm.
        self.cancel.lock().take();
    }

    /// Drain the remainder of the stream into a vector.
    pub fn collect_remaining(&self) -> Vec<DocumentResult> {
        let mut out = Vec::new();
        while let Some(document) = self.next() {
            out.push(document);
        }
        out
    }
}

impl Drop for DocumentStream {
    fn drop(&mut self) {
        self.close();
    }
}
