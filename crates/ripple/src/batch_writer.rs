//! Single-writer background thread for the incremental build path.
//!
//! [`BatchWriter`] receives normalized files over an MPSC channel and writes
//! them through a [`GraphBuilder`] on its own connection. Analysis stays
//! parallel while every graph write goes through one thread.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Ripple::index                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Main Thread          │  Background Writer Thread               │
//! │  ──────────────       │  ────────────────────────               │
//! │  normalize files      │  recv() from channel                    │
//! │  send to channel ─────┼→ accumulate until batch_size            │
//! │  ...                  │  write batch in one transaction         │
//! │  drop sender          │  log errors, continue on failure        │
//! │  finish()             │  return BuildStats                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! INHERITS and CALLS need the complete node set, so they are linked by the
//! caller after [`BatchWriter::finish`].

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, trace};

use crate::builder::{BuildStats, GraphBuilder};
use crate::db::SqliteStore;
use crate::error::{Error, Result};
use crate::normalize::NormalizedFile;

/// Result returned when the batch writer finishes.
#[derive(Debug)]
pub struct BatchWriteResult {
    /// Node and edge write counts.
    pub stats: BuildStats,
    /// Number of batches committed (transactions).
    pub batches_committed: usize,
}

/// A background writer that receives normalized files and writes them to the
/// graph store in batches.
pub struct BatchWriter {
    sender: Sender<NormalizedFile>,
    handle: JoinHandle<Result<BatchWriteResult>>,
}

impl BatchWriter {
    /// Start a writer on the database at `db_path`.
    ///
    /// # Panics
    /// Panics if `batch_size` is 0 (would cause infinite accumulation without writes).
    #[must_use]
    pub fn new(db_path: PathBuf, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch_size must be at least 1");

        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || Self::writer_thread(db_path, receiver, batch_size));

        Self { sender, handle }
    }

    /// Queue a file for writing.
    ///
    /// If the channel is disconnected (background thread exited early), the
    /// file is dropped and an error is logged; `finish` reports the cause.
    pub fn send(&self, file: NormalizedFile) {
        if let Err(e) = self.sender.send(file) {
            error!(
                file = %e.0.path,
                "Failed to send to batch writer (receiver disconnected)"
            );
        }
    }

    /// Finish writing and return the final statistics.
    ///
    /// Blocks until the background thread has written every queued file.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The background thread panicked
    /// - The database could not be opened
    /// - A write hit a contract violation
    pub fn finish(self) -> Result<BatchWriteResult> {
        drop(self.sender);

        match self.handle.join() {
            Ok(result) => result,
            Err(panic_payload) => {
                let msg = if let Some(s) = panic_payload.downcast_ref::<&str>() {
                    format!("Batch writer thread panicked: {s}")
                } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                    format!("Batch writer thread panicked: {s}")
                } else {
                    "Batch writer thread panicked with unknown payload".to_string()
                };
                error!(panic_msg = %msg, "Background batch writer thread panicked");
                Err(Error::Internal(msg))
            }
        }
    }

    #[allow(clippy::needless_pass_by_value)] // Receiver is consumed by loop, PathBuf owned by thread
    fn writer_thread(
        db_path: PathBuf,
        receiver: Receiver<NormalizedFile>,
        batch_size: usize,
    ) -> Result<BatchWriteResult> {
        let store = SqliteStore::open(&db_path)?;
        let mut builder = GraphBuilder::new(&store);
        let mut batches_committed = 0;
        let mut batch: Vec<NormalizedFile> = Vec::with_capacity(batch_size);

        while let Ok(file) = receiver.recv() {
            batch.push(file);
            if batch.len() >= batch_size {
                Self::write_batch(&store, &mut builder, &mut batch)?;
                batches_committed += 1;
            }
        }
        if !batch.is_empty() {
            Self::write_batch(&store, &mut builder, &mut batch)?;
            batches_committed += 1;
        }

        let stats = builder.into_stats();
        debug!(
            files = stats.files,
            nodes = stats.nodes_inserted + stats.nodes_updated,
            edges = stats.edges_created,
            batches = batches_committed,
            "Batch writer finished"
        );
        Ok(BatchWriteResult {
            stats,
            batches_committed,
        })
    }

    fn write_batch(
        store: &SqliteStore,
        builder: &mut GraphBuilder<'_, SqliteStore>,
        batch: &mut Vec<NormalizedFile>,
    ) -> Result<()> {
        trace!(batch_size = batch.len(), "Writing batch");

        store.begin_batch()?;
        for file in batch.drain(..) {
            if let Err(e) = builder.write_file(&file) {
                // Contract violations end the run; roll back by not committing
                error!(file = %file.path, error = %e, "Batch write aborted");
                return Err(e);
            }
        }
        store.commit_batch()
    }
}
