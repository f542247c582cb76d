//! Chunked batch writes with progress reporting.

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error};

use crate::store::{GraphStore, Record, Statement};

pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Writes record lists through a [`GraphStore`] in order-preserving chunks.
pub struct BatchWriter<'a> {
    store: &'a dyn GraphStore,
    chunk_size: usize,
    progress: bool,
}

impl<'a> BatchWriter<'a> {
    pub fn new(store: &'a dyn GraphStore, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk size must be at least 1");
        }
        Ok(Self {
            store,
            chunk_size,
            progress: false,
        })
    }

    /// Draw a progress bar while writing.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn store(&self) -> &'a dyn GraphStore {
        self.store
    }

    /// Run `statement` over `records`, one transaction per chunk.
    ///
    /// Stops at the first failing chunk; earlier chunks stay committed.
    pub async fn run(&self, statement: &Statement, records: &[Record]) -> Result<usize> {
        let bar = self.progress_bar(statement, records.len());
        let chunks = records.len().div_ceil(self.chunk_size);

        let mut written = 0;
        for (index, chunk) in records.chunks(self.chunk_size).enumerate() {
            if let Err(e) = self.store.write(statement, chunk).await {
                bar.abandon();
                error!(statement = %statement.describe(), chunk = index + 1, chunks, written, "Batch write failed");
                return Err(e);
            }
            written += chunk.len();
            bar.inc(chunk.len() as u64);
            debug!(statement = %statement.describe(), chunk = index + 1, chunks, written, "Chunk written");
        }

        bar.finish_and_clear();
        Ok(written)
    }

    fn progress_bar(&self, statement: &Statement, len: usize) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template("{spinner:.green} {msg:32} [{bar:30.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        let bar = ProgressBar::new(len as u64).with_style(style);
        bar.set_message(statement.describe());
        bar
    }
}
