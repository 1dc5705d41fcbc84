//! Record types: the canonical, normalized form of one metadata document.
//!
//! Every optional field is an explicit `Option`; an absent value is never
//! encoded as an empty string. Collections are kept in document order with
//! duplicates removed on insertion.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Record ──────────────────────────────────────────────────────────────────

/// The normalized metadata of a single ebook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
  /// Numeric identifier taken from the document's self-referential URI.
  /// `None` when the URI carried no numeric path segment.
  pub ebook_id:           Option<String>,
  pub title:              Option<String>,
  pub language:           Option<String>,
  pub publisher:          Option<String>,
  pub license:            Option<String>,
  pub rights:             Option<String>,
  /// Free-text issue date, stored verbatim.
  pub issued:             Option<String>,
  pub download_count:     Option<i64>,
  /// All non-empty descriptions, separated by a blank line.
  pub description:        Option<String>,
  /// MARC 520.
  pub summary:            Option<String>,
  /// MARC 508.
  pub production_notes:   Option<String>,
  /// MARC 908; kept as text since the source is not always numeric.
  pub reading_ease_score: Option<String>,
  contributors:           Vec<Contributor>,
  subjects:               Vec<String>,
  bookshelves:            Vec<String>,
  /// The complete format snapshot. Not deduplicated.
  pub formats:            Vec<Format>,
}

impl Record {
  /// The usable identifier of this record.
  pub fn ebook_id(&self) -> Result<&str> {
    self
      .ebook_id
      .as_deref()
      .filter(|id| !id.is_empty())
      .ok_or(Error::MissingIdentifier)
  }

  pub fn contributors(&self) -> &[Contributor] { &self.contributors }

  pub fn subjects(&self) -> &[String] { &self.subjects }

  pub fn bookshelves(&self) -> &[String] { &self.bookshelves }

  /// Append a contributor unless one with the same identity triple is
  /// already present. Returns `true` if it was added.
  pub fn push_contributor(&mut self, contributor: Contributor) -> bool {
    if self
      .contributors
      .iter()
      .any(|c| c.identity() == contributor.identity())
    {
      return false;
    }
    self.contributors.push(contributor);
    true
  }

  /// Append a subject heading unless it is already present.
  pub fn push_subject(&mut self, subject: impl Into<String>) -> bool {
    push_unique(&mut self.subjects, subject.into())
  }

  /// Append a bookshelf unless it is already present.
  pub fn push_bookshelf(&mut self, bookshelf: impl Into<String>) -> bool {
    push_unique(&mut self.bookshelves, bookshelf.into())
  }
}

fn push_unique(values: &mut Vec<String>, value: String) -> bool {
  if values.contains(&value) {
    return false;
  }
  values.push(value);
  true
}

// ─── Contributor ─────────────────────────────────────────────────────────────

/// A person or organization credited as creator of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
  /// Full display name, as it appears in the document.
  pub name:       String,
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  /// The agent URI from the source document.
  pub agent_id:   Option<String>,
  /// Aliases joined with `"; "`.
  pub alias:      Option<String>,
  /// Webpage URLs joined with `"; "`.
  pub webpage:    Option<String>,
  pub birth_year: Option<i32>,
  pub death_year: Option<i32>,
}

impl Contributor {
  /// The deduplication key. Two contributors without a birth year are equal
  /// on that axis.
  pub fn identity(&self) -> (&str, Option<i32>, Option<i32>) {
    (self.name.as_str(), self.birth_year, self.death_year)
  }
}

// ─── Format ──────────────────────────────────────────────────────────────────

/// One downloadable file of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
  /// MIME type, declared or inferred from the URL.
  pub media_type: Option<String>,
  pub url:        String,
  /// Size in bytes, when declared.
  pub size:       Option<i64>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
