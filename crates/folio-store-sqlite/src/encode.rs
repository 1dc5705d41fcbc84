//! Conversions between SQLite rows and the types returned by read queries.
//!
//! Timestamps are stored as RFC 3339 strings in UTC.

use chrono::{DateTime, Utc};
use folio_core::{Contributor, Format};

use crate::{
  Error, Result,
  report::{RecordSample, StoredRecord},
};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Column values of a `records` row before timestamp decoding.
pub struct RawRecord {
  pub id:                 i64,
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
  pub created_at:         String,
  pub updated_at:         String,
}

/// Column list matching [`RawRecord::from_row`].
pub const RECORD_COLUMNS: &str = "id, ebook_id, title, language, publisher, license, rights, \
                                  issued, download_count, description, summary, \
                                  production_notes, reading_ease_score, created_at, updated_at";

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      ebook_id:           row.get(1)?,
      title:              row.get(2)?,
      language:           row.get(3)?,
      publisher:          row.get(4)?,
      license:            row.get(5)?,
      rights:             row.get(6)?,
      issued:             row.get(7)?,
      download_count:     row.get(8)?,
      description:        row.get(9)?,
      summary:            row.get(10)?,
      production_notes:   row.get(11)?,
      reading_ease_score: row.get(12)?,
      created_at:         row.get(13)?,
      updated_at:         row.get(14)?,
    })
  }

  pub fn into_stored(self, links: RawLinks) -> Result<StoredRecord> {
    Ok(StoredRecord {
      ebook_id:           self.ebook_id,
      title:              self.title,
      language:           self.language,
      publisher:          self.publisher,
      license:            self.license,
      rights:             self.rights,
      issued:             self.issued,
      download_count:     self.download_count,
      description:        self.description,
      summary:            self.summary,
      production_notes:   self.production_notes,
      reading_ease_score: self.reading_ease_score,
      contributors:       links.contributors,
      subjects:           links.subjects,
      bookshelves:        links.bookshelves,
      formats:            links.formats,
      created_at:         decode_dt(&self.created_at)?,
      updated_at:         decode_dt(&self.updated_at)?,
    })
  }
}

/// Everything a record references through join tables or ownership.
#[derive(Default)]
pub struct RawLinks {
  pub contributors: Vec<Contributor>,
  pub subjects:     Vec<String>,
  pub bookshelves:  Vec<String>,
  pub formats:      Vec<Format>,
}

pub fn contributor_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contributor> {
  Ok(Contributor {
    name:       row.get(0)?,
    first_name: row.get(1)?,
    last_name:  row.get(2)?,
    birth_year: row.get(3)?,
    death_year: row.get(4)?,
    agent_id:   row.get(5)?,
    alias:      row.get(6)?,
    webpage:    row.get(7)?,
  })
}

pub fn format_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Format> {
  Ok(Format {
    media_type: row.get(0)?,
    url:        row.get(1)?,
    size:       row.get(2)?,
  })
}

/// A sample row: `(ebook_id, title, contributors, created_at)`.
pub struct RawSample {
  pub ebook_id:     String,
  pub title:        Option<String>,
  pub contributors: Option<String>,
  pub created_at:   String,
}

impl RawSample {
  pub fn into_sample(self) -> Result<RecordSample> {
    Ok(RecordSample {
      ebook_id:     self.ebook_id,
      title:        self.title,
      contributors: self.contributors,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}
