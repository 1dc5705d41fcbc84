//! SQL schema for the Folio SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! layout so later migrations can be gated on it.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous  = NORMAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS records (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    ebook_id           TEXT NOT NULL UNIQUE,
    title              TEXT,
    language           TEXT,
    publisher          TEXT,
    license            TEXT,
    rights             TEXT,
    issued             TEXT,
    download_count     INTEGER,
    description        TEXT,
    summary            TEXT,
    production_notes   TEXT,
    reading_ease_score TEXT,
    created_at         TEXT NOT NULL,   -- RFC 3339 UTC; set on first insert
    updated_at         TEXT NOT NULL    -- RFC 3339 UTC; refreshed on upsert
);

-- Shared across records; identity is (name, birth_year, death_year) with
-- NULL years compared as equal.
CREATE TABLE IF NOT EXISTS contributors (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    first_name  TEXT,
    last_name   TEXT,
    birth_year  INTEGER,
    death_year  INTEGER,
    agent_id    TEXT,
    alias       TEXT,
    webpage     TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subjects (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    subject     TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bookshelves (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    bookshelf   TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

-- Owned by a record; replaced wholesale when a record re-imports with
-- a non-empty format list.
CREATE TABLE IF NOT EXISTS formats (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id   INTEGER NOT NULL REFERENCES records(id) ON DELETE CASCADE,
    media_type  TEXT,
    url         TEXT NOT NULL,
    size        INTEGER
);

CREATE TABLE IF NOT EXISTS record_contributors (
    record_id       INTEGER NOT NULL REFERENCES records(id) ON DELETE CASCADE,
    contributor_id  INTEGER NOT NULL REFERENCES contributors(id),
    PRIMARY KEY (record_id, contributor_id)
);

CREATE TABLE IF NOT EXISTS record_subjects (
    record_id   INTEGER NOT NULL REFERENCES records(id) ON DELETE CASCADE,
    subject_id  INTEGER NOT NULL REFERENCES subjects(id),
    PRIMARY KEY (record_id, subject_id)
);

CREATE TABLE IF NOT EXISTS record_bookshelves (
    record_id     INTEGER NOT NULL REFERENCES records(id) ON DELETE CASCADE,
    bookshelf_id  INTEGER NOT NULL REFERENCES bookshelves(id),
    PRIMARY KEY (record_id, bookshelf_id)
);

CREATE UNIQUE INDEX IF NOT EXISTS contributors_identity_idx
    ON contributors(name, COALESCE(birth_year, -1), COALESCE(death_year, -1));

CREATE INDEX IF NOT EXISTS records_title_idx         ON records(title);
CREATE INDEX IF NOT EXISTS records_language_idx      ON records(language);
CREATE INDEX IF NOT EXISTS contributors_name_idx     ON contributors(name);
CREATE INDEX IF NOT EXISTS formats_record_idx        ON formats(record_id);
CREATE INDEX IF NOT EXISTS formats_media_type_idx    ON formats(media_type);
CREATE INDEX IF NOT EXISTS record_contributors_c_idx ON record_contributors(contributor_id);
CREATE INDEX IF NOT EXISTS record_subjects_s_idx     ON record_subjects(subject_id);
CREATE INDEX IF NOT EXISTS record_bookshelves_b_idx  ON record_bookshelves(bookshelf_id);

PRAGMA user_version = 1;
";

/// Tables reported by [`crate::SqliteStore::report`], in display order.
pub const TABLES: &[&str] = &[
  "records",
  "contributors",
  "subjects",
  "bookshelves",
  "formats",
  "record_contributors",
  "record_subjects",
  "record_bookshelves",
];
