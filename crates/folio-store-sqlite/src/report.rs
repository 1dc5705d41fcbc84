//! Read-side queries: the diagnostic report and single-record lookup.

use std::fmt;

use chrono::{DateTime, Utc};
use folio_core::{Contributor, Format};
use rusqlite::OptionalExtension as _;
use serde::Serialize;

use crate::{
  Result, SqliteStore,
  encode::{
    RECORD_COLUMNS, RawLinks, RawRecord, RawSample, contributor_from_row, format_from_row,
  },
  schema::TABLES,
};

// ─── Types ───────────────────────────────────────────────────────────────────

/// Row counts and a few sample records, as printed by `folio verify`.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogReport {
  pub schema_version: i64,
  pub tables:         Vec<TableCount>,
  pub samples:        Vec<RecordSample>,
}

/// A table's row count, or why it could not be counted.
#[derive(Debug, Clone, Serialize)]
pub struct TableCount {
  pub table: &'static str,
  pub rows:  Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordSample {
  pub ebook_id:     String,
  pub title:        Option<String>,
  /// Contributor names joined with `", "`.
  pub contributors: Option<String>,
  pub created_at:   DateTime<Utc>,
}

/// A record as committed, with its associations resolved.
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
  pub ebook_id:           String,
  pub title:              Option<String>,
  pub language:           Option<String>,
  pub publisher:          Option<String>,
  pub license:            Option<String>,
  pub rights:             Option<String>,
  pub issued:             Option<String>,
  pub download_count:     Option<i64>,
  pub description:        Option<String>,
  pub summary:            Option<String>,
  pub production_notes:   Option<String>,
  pub reading_ease_score: Option<String>,
  pub contributors:       Vec<Contributor>,
  pub subjects:           Vec<String>,
  pub bookshelves:        Vec<String>,
  pub formats:            Vec<Format>,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
}

// ─── Queries ─────────────────────────────────────────────────────────────────

impl SqliteStore {
  /// Count every table and sample the first `sample` records.
  ///
  /// A table that cannot be counted is reported with its error instead of
  /// failing the whole report.
  pub async fn report(&self, sample: usize) -> Result<CatalogReport> {
    let limit = i64::try_from(sample).unwrap_or(i64::MAX);
    let (schema_version, tables, raw) = self
      .conn
      .call(move |conn| {
        let version: i64 =
          conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

        let tables = TABLES
          .iter()
          .map(|&table| {
            let counted: rusqlite::Result<i64> = conn.query_row(
              &format!("SELECT COUNT(*) FROM {table}"),
              [],
              |r| r.get(0),
            );
            match counted {
              Ok(rows) => TableCount { table, rows: Some(rows), error: None },
              Err(e) => TableCount { table, rows: None, error: Some(e.to_string()) },
            }
          })
          .collect::<Vec<_>>();

        let mut stmt = conn.prepare(
          "SELECT r.ebook_id, r.title,
                  (SELECT GROUP_CONCAT(c.name, ', ')
                     FROM record_contributors rc
                     JOIN contributors c ON c.id = rc.contributor_id
                    WHERE rc.record_id = r.id),
                  r.created_at
             FROM records r
            ORDER BY r.id
            LIMIT ?1",
        )?;
        let raw = stmt
          .query_map([limit], |row| {
            Ok(RawSample {
              ebook_id:     row.get(0)?,
              title:        row.get(1)?,
              contributors: row.get(2)?,
              created_at:   row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((version, tables, raw))
      })
      .await?;

    let samples = raw
      .into_iter()
      .map(RawSample::into_sample)
      .collect::<Result<Vec<_>>>()?;

    Ok(CatalogReport { schema_version, tables, samples })
  }

  /// Load the committed record with `ebook_id`, if any.
  pub async fn get_record(&self, ebook_id: &str) -> Result<Option<StoredRecord>> {
    let ebook_id = ebook_id.to_owned();
    let found = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM records WHERE ebook_id = ?1"),
            [&ebook_id],
            RawRecord::from_row,
          )
          .optional()?;
        let Some(raw) = raw else { return Ok(None) };

        let contributors = conn
          .prepare(
            "SELECT c.name, c.first_name, c.last_name, c.birth_year, c.death_year,
                    c.agent_id, c.alias, c.webpage
               FROM record_contributors rc
               JOIN contributors c ON c.id = rc.contributor_id
              WHERE rc.record_id = ?1
              ORDER BY c.id",
          )?
          .query_map([raw.id], contributor_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let subjects = conn
          .prepare(
            "SELECT s.subject FROM record_subjects rs
               JOIN subjects s ON s.id = rs.subject_id
              WHERE rs.record_id = ?1
              ORDER BY s.id",
          )?
          .query_map([raw.id], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;

        let bookshelves = conn
          .prepare(
            "SELECT b.bookshelf FROM record_bookshelves rb
               JOIN bookshelves b ON b.id = rb.bookshelf_id
              WHERE rb.record_id = ?1
              ORDER BY b.id",
          )?
          .query_map([raw.id], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;

        let formats = conn
          .prepare(
            "SELECT media_type, url, size FROM formats
              WHERE record_id = ?1
              ORDER BY id",
          )?
          .query_map([raw.id], format_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let links = RawLinks { contributors, subjects, bookshelves, formats };
        Ok(Some((raw, links)))
      })
      .await?;

    found.map(|(raw, links)| raw.into_stored(links)).transpose()
  }
}

// ─── Display ─────────────────────────────────────────────────────────────────

impl fmt::Display for CatalogReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Schema version: {}", self.schema_version)?;
    writeln!(f)?;
    writeln!(f, "Table counts:")?;
    for t in &self.tables {
      match (t.rows, &t.error) {
        (Some(rows), _) => writeln!(f, "  {:<20} {rows:>10}", t.table)?,
        (None, Some(e)) => writeln!(f, "  {:<20} ERROR ({e})", t.table)?,
        (None, None) => writeln!(f, "  {:<20} {:>10}", t.table, "?")?,
      }
    }

    writeln!(f)?;
    if self.samples.is_empty() {
      return writeln!(f, "No records.");
    }
    writeln!(f, "Sample records:")?;
    for s in &self.samples {
      write!(f, "  {:<8} {}", s.ebook_id, s.title.as_deref().unwrap_or("(untitled)"))?;
      if let Some(names) = &s.contributors {
        write!(f, " by {names}")?;
      }
      writeln!(f, " [added {}]", s.created_at.format("%Y-%m-%d %H:%M:%S"))?;
    }
    Ok(())
  }
}
