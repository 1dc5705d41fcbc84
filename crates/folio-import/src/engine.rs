//! The import engine: a fixed pool of workers feeding a single-writer store.
//!
//! ```text
//!   paths ──▶ bounded queue ──▶ worker × N ──▶ batch ──▶ CatalogStore
//!                                  │ extract (blocking pool)
//!                                  │ resume check
//!                                  └─ outcome ──▶ ImportStats
//! ```

use std::{path::PathBuf, sync::Arc};

use folio_core::{CatalogStore, Record};
use serde::Deserialize;
use tokio::{
  sync::{Mutex, mpsc},
  task::JoinSet,
};

use crate::{
  error::{DocumentError, Error, Result},
  stats::{ImportStats, ImportSummary},
};

/// Log a progress line every this many documents.
const PROGRESS_INTERVAL: usize = 1000;

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
  /// Records accumulated by a worker before one store call.
  pub batch_size: usize,
  /// Number of concurrent workers.
  pub workers:    usize,
  /// Skip documents whose record is already stored.
  pub resume:     bool,
}

impl Default for ImportConfig {
  fn default() -> Self { Self { batch_size: 1000, workers: 4, resume: false } }
}

impl ImportConfig {
  pub fn validate(&self) -> Result<()> {
    if self.batch_size == 0 {
      return Err(Error::InvalidConfig("batch_size must be at least 1".into()));
    }
    if self.workers == 0 {
      return Err(Error::InvalidConfig("workers must be at least 1".into()));
    }
    Ok(())
  }
}

// ─── Importer ────────────────────────────────────────────────────────────────

pub struct Importer<S> {
  store:  Arc<S>,
  config: ImportConfig,
}

impl<S: CatalogStore + 'static> Importer<S> {
  /// Fails when `config` is invalid.
  pub fn new(store: Arc<S>, config: ImportConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self { store, config })
  }

  pub fn config(&self) -> &ImportConfig { &self.config }

  /// Import every document in `paths` and return the final statistics.
  ///
  /// Per-document failures are recorded, never returned. The call returns
  /// once every worker has drained the queue and flushed its batch.
  pub async fn run(&self, paths: Vec<PathBuf>) -> ImportSummary {
    let stats = Arc::new(ImportStats::new(paths.len()));
    tracing::info!(
      documents = paths.len(),
      workers = self.config.workers,
      batch_size = self.config.batch_size,
      resume = self.config.resume,
      "starting import"
    );

    let (tx, rx) = mpsc::channel::<PathBuf>(self.config.workers * 2);
    let queue = Arc::new(Mutex::new(rx));

    let mut workers = JoinSet::new();
    for id in 0..self.config.workers {
      let worker = Worker {
        id,
        store: Arc::clone(&self.store),
        stats: Arc::clone(&stats),
        queue: Arc::clone(&queue),
        batch: Vec::with_capacity(self.config.batch_size),
        batch_size: self.config.batch_size,
        resume: self.config.resume,
      };
      workers.spawn(worker.run());
    }

    for path in paths {
      if tx.send(path).await.is_err() {
        tracing::error!("all import workers exited early");
        break;
      }
    }
    drop(tx);

    while let Some(joined) = workers.join_next().await {
      if let Err(e) = joined {
        tracing::error!(error = %e, "import worker aborted");
      }
    }

    let summary = stats.snapshot();
    tracing::info!(
      processed = summary.processed,
      succeeded = summary.succeeded,
      failed = summary.failed,
      skipped = summary.skipped,
      elapsed_secs = summary.elapsed_secs,
      "import finished"
    );
    summary
  }
}

// ─── Worker ──────────────────────────────────────────────────────────────────

struct Worker<S> {
  id:         usize,
  store:      Arc<S>,
  stats:      Arc<ImportStats>,
  queue:      Arc<Mutex<mpsc::Receiver<PathBuf>>>,
  batch:      Vec<Record>,
  batch_size: usize,
  resume:     bool,
}

impl<S: CatalogStore + 'static> Worker<S> {
  async fn run(mut self) {
    loop {
      let next = self.queue.lock().await.recv().await;
      let Some(path) = next else { break };
      self.process(path).await;
    }
    self.flush().await;
    tracing::debug!(worker = self.id, "worker drained");
  }

  async fn process(&mut self, path: PathBuf) {
    let record = match extract(path.clone()).await {
      Ok(record) => record,
      Err(e) => return self.fail(e),
    };
    let ebook_id = match record.ebook_id() {
      Ok(id) => id.to_owned(),
      Err(_) => return self.fail(DocumentError::MissingIdentifier { path }),
    };

    if self.resume {
      match self.store.exists(&ebook_id).await {
        Ok(true) => {
          tracing::debug!(ebook_id = %ebook_id, "already stored, skipping");
          let processed = self.stats.record_skip();
          return self.progress(processed);
        }
        Ok(false) => {}
        Err(e) => {
          tracing::warn!(ebook_id = %ebook_id, error = %e, "existence check failed, importing anyway");
        }
      }
    }

    tracing::debug!(ebook_id = %ebook_id, path = %path.display(), "extracted record");
    self.batch.push(record);
    if self.batch.len() >= self.batch_size {
      self.flush().await;
    }
  }

  async fn flush(&mut self) {
    if self.batch.is_empty() {
      return;
    }
    let batch = std::mem::take(&mut self.batch);
    let ids: Vec<String> = batch
      .iter()
      .map(|r| r.ebook_id.clone().unwrap_or_default())
      .collect();

    match self.store.upsert_batch(batch).await {
      Ok(outcomes) => {
        for (ebook_id, outcome) in ids.into_iter().zip(outcomes) {
          match outcome {
            Ok(()) => {
              let processed = self.stats.record_success();
              self.progress(processed);
            }
            Err(e) => self.fail(DocumentError::Persist { ebook_id, source: Box::new(e) }),
          }
        }
      }
      Err(e) => {
        tracing::error!(worker = self.id, records = ids.len(), error = %e, "batch failed");
        let message = e.to_string();
        for ebook_id in ids {
          self.fail(DocumentError::Persist { ebook_id, source: message.clone().into() });
        }
      }
    }
  }

  fn fail(&self, err: DocumentError) {
    tracing::warn!(worker = self.id, error = %err, "document failed");
    let processed = self.stats.record_failure(err.kind(), err.to_string());
    self.progress(processed);
  }

  fn progress(&self, processed: usize) {
    if processed % PROGRESS_INTERVAL == 0 {
      tracing::info!(processed, "import progress");
    }
  }
}

/// Parse `path` on the blocking pool. A panic in the extractor is a parse
/// failure of that document.
async fn extract(path: PathBuf) -> Result<Record, DocumentError> {
  let file = path.clone();
  match tokio::task::spawn_blocking(move || folio_rdf::parse_file(file)).await {
    Ok(Ok(record)) => Ok(record),
    Ok(Err(source)) => Err(DocumentError::Parse { path, source }),
    Err(e) => Err(DocumentError::Aborted { path, reason: e.to_string() }),
  }
}
