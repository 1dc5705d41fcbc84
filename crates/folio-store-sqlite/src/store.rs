//! [`SqliteStore`], the SQLite implementation of [`CatalogStore`].

use std::{path::Path, time::Duration};

use chrono::Utc;
use rusqlite::{OpenFlags, OptionalExtension as _, Transaction, TransactionBehavior};

use folio_core::{CatalogStore, Contributor, Record};

use crate::{Error, Result, encode::encode_dt, schema::SCHEMA};

/// How long a statement waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Folio catalog backed by a single SQLite file.
///
/// Every statement runs on the connection's one background thread, so the
/// store is its own single writer. Cloning is cheap.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened catalog store");
    Ok(store)
  }

  /// Open an in-memory store. Useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an existing store without write access or schema setup.
  pub async fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_with_flags(
      path,
      OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .await?;
    Ok(Self { conn })
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  async fn exists(&self, ebook_id: &str) -> Result<bool> {
    let ebook_id = ebook_id.to_owned();
    let found = self
      .conn
      .call(move |conn| {
        let found: bool = conn.query_row(
          "SELECT EXISTS(SELECT 1 FROM records WHERE ebook_id = ?1)",
          rusqlite::params![ebook_id],
          |r| r.get(0),
        )?;
        Ok(found)
      })
      .await?;
    Ok(found)
  }

  async fn upsert(&self, record: Record) -> Result<()> {
    let now = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| Ok(persist(conn, &record, &now)))
      .await?
  }

  async fn upsert_batch(&self, records: Vec<Record>) -> Result<Vec<Result<()>>> {
    let now = encode_dt(Utc::now());
    let outcomes = self
      .conn
      .call(move |conn| {
        let outcomes: Vec<Result<()>> =
          records.iter().map(|r| persist(conn, r, &now)).collect();
        Ok(outcomes)
      })
      .await?;

    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    tracing::debug!(records = outcomes.len(), failed, "committed batch");
    Ok(outcomes)
  }
}

// ─── Upsert ──────────────────────────────────────────────────────────────────

/// Validate `record` and write it in its own transaction.
fn persist(conn: &mut rusqlite::Connection, record: &Record, now: &str) -> Result<()> {
  let ebook_id = record.ebook_id()?;
  upsert_record(conn, ebook_id, record, now).map_err(|source| Error::Persist {
    ebook_id: ebook_id.to_owned(),
    source,
  })
}

/// Write one record and everything it references. Either all of it commits
/// or the transaction rolls back on drop.
fn upsert_record(
  conn: &mut rusqlite::Connection,
  ebook_id: &str,
  record: &Record,
  now: &str,
) -> rusqlite::Result<()> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let record_pk: i64 = tx.query_row(
    "INSERT INTO records (
         ebook_id, title, language, publisher, license, rights, issued,
         download_count, description, summary, production_notes,
         reading_ease_score, created_at, updated_at
     )
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
     ON CONFLICT(ebook_id) DO UPDATE SET
         title              = excluded.title,
         language           = excluded.language,
         publisher          = excluded.publisher,
         license            = excluded.license,
         rights             = excluded.rights,
         issued             = excluded.issued,
         download_count     = excluded.download_count,
         description        = excluded.description,
         summary            = excluded.summary,
         production_notes   = excluded.production_notes,
         reading_ease_score = excluded.reading_ease_score,
         updated_at         = excluded.updated_at
     RETURNING id",
    rusqlite::params![
      ebook_id,
      record.title,
      record.language,
      record.publisher,
      record.license,
      record.rights,
      record.issued,
      record.download_count,
      record.description,
      record.summary,
      record.production_notes,
      record.reading_ease_score,
      now,
    ],
    |r| r.get(0),
  )?;

  for contributor in record.contributors() {
    let contributor_pk = contributor_id(&tx, contributor, now)?;
    tx.prepare_cached(
      "INSERT OR IGNORE INTO record_contributors (record_id, contributor_id)
       VALUES (?1, ?2)",
    )?
    .execute(rusqlite::params![record_pk, contributor_pk])?;
  }

  for subject in record.subjects() {
    link_term(&tx, &SUBJECTS, record_pk, subject, now)?;
  }
  for bookshelf in record.bookshelves() {
    link_term(&tx, &BOOKSHELVES, record_pk, bookshelf, now)?;
  }

  // An empty list leaves previously stored formats untouched.
  if !record.formats.is_empty() {
    tx.execute("DELETE FROM formats WHERE record_id = ?1", [record_pk])?;
    let mut insert = tx.prepare_cached(
      "INSERT INTO formats (record_id, media_type, url, size)
       VALUES (?1, ?2, ?3, ?4)",
    )?;
    for format in &record.formats {
      insert.execute(rusqlite::params![
        record_pk,
        format.media_type,
        format.url,
        format.size,
      ])?;
    }
  }

  tx.commit()
}

/// Find the contributor with the same identity or create it. An existing row
/// only has its empty descriptive fields filled in.
fn contributor_id(tx: &Transaction<'_>, c: &Contributor, now: &str) -> rusqlite::Result<i64> {
  let existing: Option<i64> = tx
    .prepare_cached(
      "SELECT id FROM contributors
       WHERE name = ?1
         AND COALESCE(birth_year, -1) = COALESCE(?2, -1)
         AND COALESCE(death_year, -1) = COALESCE(?3, -1)",
    )?
    .query_row(rusqlite::params![c.name, c.birth_year, c.death_year], |r| {
      r.get(0)
    })
    .optional()?;

  match existing {
    Some(id) => {
      tx.prepare_cached(
        "UPDATE contributors SET
             first_name = COALESCE(NULLIF(first_name, ''), ?2),
             last_name  = COALESCE(NULLIF(last_name,  ''), ?3),
             agent_id   = COALESCE(NULLIF(agent_id,   ''), ?4),
             alias      = COALESCE(NULLIF(alias,      ''), ?5),
             webpage    = COALESCE(NULLIF(webpage,    ''), ?6)
         WHERE id = ?1",
      )?
      .execute(rusqlite::params![
        id,
        c.first_name,
        c.last_name,
        c.agent_id,
        c.alias,
        c.webpage,
      ])?;
      Ok(id)
    }
    None => {
      tx.prepare_cached(
        "INSERT INTO contributors (
             name, first_name, last_name, birth_year, death_year,
             agent_id, alias, webpage, created_at
         )
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
      )?
      .execute(rusqlite::params![
        c.name,
        c.first_name,
        c.last_name,
        c.birth_year,
        c.death_year,
        c.agent_id,
        c.alias,
        c.webpage,
        now,
      ])?;
      Ok(tx.last_insert_rowid())
    }
  }
}

// ─── Vocabularies ────────────────────────────────────────────────────────────

/// Statements for a shared vocabulary table and its join table.
struct Vocabulary {
  select: &'static str,
  insert: &'static str,
  link:   &'static str,
}

const SUBJECTS: Vocabulary = Vocabulary {
  select: "SELECT id FROM subjects WHERE subject = ?1",
  insert: "INSERT INTO subjects (subject, created_at) VALUES (?1, ?2)",
  link:   "INSERT OR IGNORE INTO record_subjects (record_id, subject_id) VALUES (?1, ?2)",
};

const BOOKSHELVES: Vocabulary = Vocabulary {
  select: "SELECT id FROM bookshelves WHERE bookshelf = ?1",
  insert: "INSERT INTO bookshelves (bookshelf, created_at) VALUES (?1, ?2)",
  link:   "INSERT OR IGNORE INTO record_bookshelves (record_id, bookshelf_id) VALUES (?1, ?2)",
};

fn link_term(
  tx: &Transaction<'_>,
  vocab: &Vocabulary,
  record_pk: i64,
  term: &str,
  now: &str,
) -> rusqlite::Result<()> {
  let existing: Option<i64> = tx
    .prepare_cached(vocab.select)?
    .query_row([term], |r| r.get(0))
    .optional()?;

  let term_pk = match existing {
    Some(id) => id,
    None => {
      tx.prepare_cached(vocab.insert)?
        .execute(rusqlite::params![term, now])?;
      tx.last_insert_rowid()
    }
  };

  tx.prepare_cached(vocab.link)?
    .execute(rusqlite::params![record_pk, term_pk])?;
  Ok(())
}
