//! Run statistics shared by every worker of an import.

use std::{collections::VecDeque, fmt, time::Instant};

use parking_lot::Mutex;
use serde::Serialize;

/// Most recent error messages kept per run.
pub const ERROR_RING_CAPACITY: usize = 100;

/// Errors rendered by [`ImportSummary`]'s `Display`.
const DISPLAYED_ERRORS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  Parse,
  MissingIdentifier,
  Persist,
}

#[derive(Debug, Default)]
struct Counters {
  processed:          usize,
  succeeded:          usize,
  skipped:            usize,
  parse:              usize,
  missing_identifier: usize,
  persist:            usize,
  recent_errors:      VecDeque<String>,
}

/// Aggregates per-document outcomes. Every `record_*` call is one terminal
/// outcome and returns the number of documents processed so far.
#[derive(Debug)]
pub struct ImportStats {
  total:    usize,
  started:  Instant,
  counters: Mutex<Counters>,
}

impl ImportStats {
  pub fn new(total: usize) -> Self {
    Self {
      total,
      started: Instant::now(),
      counters: Mutex::new(Counters::default()),
    }
  }

  pub fn record_success(&self) -> usize {
    let mut c = self.counters.lock();
    c.succeeded += 1;
    c.processed += 1;
    c.processed
  }

  pub fn record_skip(&self) -> usize {
    let mut c = self.counters.lock();
    c.skipped += 1;
    c.processed += 1;
    c.processed
  }

  pub fn record_failure(&self, kind: FailureKind, message: impl Into<String>) -> usize {
    let mut c = self.counters.lock();
    match kind {
      FailureKind::Parse => c.parse += 1,
      FailureKind::MissingIdentifier => c.missing_identifier += 1,
      FailureKind::Persist => c.persist += 1,
    }
    if c.recent_errors.len() == ERROR_RING_CAPACITY {
      c.recent_errors.pop_front();
    }
    c.recent_errors.push_back(message.into());
    c.processed += 1;
    c.processed
  }

  pub fn snapshot(&self) -> ImportSummary {
    let c = self.counters.lock();
    ImportSummary {
      total:         self.total,
      processed:     c.processed,
      succeeded:     c.succeeded,
      failed:        c.parse + c.missing_identifier + c.persist,
      skipped:       c.skipped,
      failures:      FailureCounts {
        parse:              c.parse,
        missing_identifier: c.missing_identifier,
        persist:            c.persist,
      },
      recent_errors: c.recent_errors.iter().cloned().collect(),
      elapsed_secs:  self.started.elapsed().as_secs_f64(),
    }
  }
}

// ─── Summary ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FailureCounts {
  pub parse:              usize,
  pub missing_identifier: usize,
  pub persist:            usize,
}

/// A point-in-time copy of [`ImportStats`].
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
  pub total:         usize,
  pub processed:     usize,
  pub succeeded:     usize,
  pub failed:        usize,
  pub skipped:       usize,
  pub failures:      FailureCounts,
  /// Oldest first, at most [`ERROR_RING_CAPACITY`] entries.
  pub recent_errors: Vec<String>,
  pub elapsed_secs:  f64,
}

impl ImportSummary {
  /// Percentage of processed documents that were stored; `None` before any
  /// document was processed.
  pub fn success_rate(&self) -> Option<f64> {
    (self.processed > 0).then(|| self.succeeded as f64 / self.processed as f64 * 100.0)
  }
}

impl fmt::Display for ImportSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Import summary")?;
    writeln!(f, "==============")?;
    writeln!(f, "Total documents: {}", self.total)?;
    writeln!(f, "Processed:       {}", self.processed)?;
    writeln!(f, "Succeeded:       {}", self.succeeded)?;
    writeln!(
      f,
      "Failed:          {} (parse: {}, missing identifier: {}, persist: {})",
      self.failed,
      self.failures.parse,
      self.failures.missing_identifier,
      self.failures.persist,
    )?;
    writeln!(f, "Skipped:         {}", self.skipped)?;
    match self.success_rate() {
      Some(rate) => writeln!(f, "Success rate:    {rate:.2}%")?,
      None => writeln!(f, "Success rate:    N/A (no documents processed)")?,
    }
    writeln!(f, "Elapsed:         {:.1}s", self.elapsed_secs)?;

    if !self.recent_errors.is_empty() {
      writeln!(f)?;
      writeln!(f, "Recent errors ({} kept):", self.recent_errors.len())?;
      for e in self.recent_errors.iter().take(DISPLAYED_ERRORS) {
        writeln!(f, "  - {e}")?;
      }
      if self.recent_errors.len() > DISPLAYED_ERRORS {
        writeln!(f, "  ... and {} more", self.recent_errors.len() - DISPLAYED_ERRORS)?;
      }
    }
    Ok(())
  }
}
