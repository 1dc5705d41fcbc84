//! End-to-end tests: sources and engine against an in-memory SQLite store.

use std::{
  fs,
  io::Write as _,
  path::{Path, PathBuf},
  sync::Arc,
};

use folio_core::{CatalogStore, Record};
use folio_store_sqlite::SqliteStore;

use crate::{
  ArchiveSource, DirectorySource, DocumentSource, Error, ImportConfig, Importer, StagingMode,
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn rdf(id: &str, title: &str, author: &str) -> String {
  format!(
    r#"<?xml version="1.0" encoding="utf-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:pgterms="http://www.gutenberg.org/2009/pgterms/"
         xmlns:dcterms="http://purl.org/dc/terms/">
  <pgterms:ebook rdf:about="ebooks/{id}">
    <dcterms:title>{title}</dcterms:title>
    <dcterms:creator>
      <pgterms:agent rdf:about="2009/agents/1">
        <pgterms:name>{author}</pgterms:name>
        <pgterms:birthdate>1797</pgterms:birthdate>
      </pgterms:agent>
    </dcterms:creator>
    <dcterms:hasFormat>
      <pgterms:file rdf:about="https://www.gutenberg.org/ebooks/{id}.epub.images"/>
    </dcterms:hasFormat>
  </pgterms:ebook>
</rdf:RDF>"#
  )
}

fn write_doc(dir: &Path, name: &str, body: &str) -> PathBuf {
  let path = dir.join(name);
  fs::write(&path, body).unwrap();
  path
}

async fn store() -> Arc<SqliteStore> {
  Arc::new(
    SqliteStore::open_in_memory()
      .await
      .expect("in-memory store"),
  )
}

fn config(workers: usize, batch_size: usize, resume: bool) -> ImportConfig {
  ImportConfig { batch_size, workers, resume }
}

async fn table_rows(store: &SqliteStore, table: &str) -> Option<i64> {
  let report = store.report(0).await.unwrap();
  report.tables.into_iter().find(|t| t.table == table).and_then(|t| t.rows)
}

// ─── Engine ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_document_gets_exactly_one_outcome() {
  let dir = tempfile::tempdir().unwrap();
  let mut paths = vec![
    write_doc(dir.path(), "pg1.rdf", &rdf("1", "One", "Shelley, Mary")),
    write_doc(dir.path(), "pg2.rdf", &rdf("2", "Two", "Shelley, Mary")),
    write_doc(dir.path(), "pg3.rdf", &rdf("3", "Three", "Austen, Jane")),
    write_doc(dir.path(), "broken.rdf", "<rdf:RDF><pgterms:ebook"),
    write_doc(dir.path(), "noid.rdf", &rdf("", "Nameless", "Anonymous")),
  ];
  paths.push(dir.path().join("missing.rdf"));

  let s = store().await;
  let importer = Importer::new(Arc::clone(&s), config(3, 2, false)).unwrap();
  let summary = importer.run(paths).await;

  assert_eq!(summary.total, 6);
  assert_eq!(summary.processed, 6);
  assert_eq!(summary.succeeded, 3);
  assert_eq!(summary.skipped, 0);
  assert_eq!(summary.failed, 3);
  assert_eq!(summary.failures.parse, 2);
  assert_eq!(summary.failures.missing_identifier, 1);
  assert_eq!(summary.failures.persist, 0);
  assert_eq!(summary.recent_errors.len(), 3);

  assert_eq!(table_rows(&s, "records").await, Some(3));
  assert_eq!(table_rows(&s, "contributors").await, Some(2));
  assert_eq!(table_rows(&s, "record_contributors").await, Some(3));

  let stored = s.get_record("3").await.unwrap().unwrap();
  assert_eq!(stored.title.as_deref(), Some("Three"));
  assert_eq!(stored.formats[0].media_type.as_deref(), Some("application/epub+zip"));
}

#[tokio::test]
async fn partial_batches_are_flushed_at_the_end() {
  let dir = tempfile::tempdir().unwrap();
  let paths: Vec<PathBuf> = (1..=5)
    .map(|i| {
      write_doc(
        dir.path(),
        &format!("pg{i}.rdf"),
        &rdf(&i.to_string(), "Title", "Author, Some"),
      )
    })
    .collect();

  let s = store().await;
  let summary = Importer::new(Arc::clone(&s), config(1, 2, false))
    .unwrap()
    .run(paths)
    .await;

  assert_eq!(summary.succeeded, 5);
  assert_eq!(table_rows(&s, "records").await, Some(5));
}

#[tokio::test]
async fn resume_skips_stored_records_and_leaves_them_untouched() {
  let dir = tempfile::tempdir().unwrap();
  let path = write_doc(dir.path(), "pg84.rdf", &rdf("84", "Frankenstein", "Shelley, Mary"));
  let s = store().await;

  let first = Importer::new(Arc::clone(&s), config(2, 10, true))
    .unwrap()
    .run(vec![path.clone()])
    .await;
  assert_eq!((first.succeeded, first.skipped), (1, 0));

  write_doc(dir.path(), "pg84.rdf", &rdf("84", "Retitled", "Shelley, Mary"));
  let second = Importer::new(Arc::clone(&s), config(2, 10, true))
    .unwrap()
    .run(vec![path.clone()])
    .await;
  assert_eq!((second.succeeded, second.skipped), (0, 1));
  let stored = s.get_record("84").await.unwrap().unwrap();
  assert_eq!(stored.title.as_deref(), Some("Frankenstein"));

  let third = Importer::new(Arc::clone(&s), config(2, 10, false))
    .unwrap()
    .run(vec![path])
    .await;
  assert_eq!((third.succeeded, third.skipped), (1, 0));
  let stored = s.get_record("84").await.unwrap().unwrap();
  assert_eq!(stored.title.as_deref(), Some("Retitled"));
}

#[tokio::test]
async fn repeated_runs_are_idempotent() {
  let dir = tempfile::tempdir().unwrap();
  let paths: Vec<PathBuf> = (1..=20)
    .map(|i| {
      write_doc(
        dir.path(),
        &format!("pg{i}.rdf"),
        &rdf(&i.to_string(), "Title", "Shelley, Mary"),
      )
    })
    .collect();
  let s = store().await;
  let importer = Importer::new(Arc::clone(&s), config(4, 3, false)).unwrap();

  importer.run(paths.clone()).await;
  let summary = importer.run(paths).await;

  assert_eq!(summary.succeeded, 20);
  assert_eq!(table_rows(&s, "records").await, Some(20));
  assert_eq!(table_rows(&s, "contributors").await, Some(1));
  assert_eq!(table_rows(&s, "formats").await, Some(20));
}

#[tokio::test]
async fn empty_run_reports_nothing() {
  let s = store().await;
  let summary = Importer::new(s, ImportConfig::default())
    .unwrap()
    .run(Vec::new())
    .await;
  assert_eq!((summary.total, summary.processed), (0, 0));
  assert_eq!(summary.success_rate(), None);
}

#[tokio::test]
async fn zero_workers_or_batch_size_is_rejected() {
  let s = store().await;
  assert!(matches!(
    Importer::new(Arc::clone(&s), config(0, 10, false)),
    Err(Error::InvalidConfig(_))
  ));
  assert!(matches!(
    Importer::new(s, config(2, 0, false)),
    Err(Error::InvalidConfig(_))
  ));
}

/// A store whose every call fails.
struct BrokenStore;

#[derive(Debug, thiserror::Error)]
#[error("store is offline")]
struct Offline;

impl CatalogStore for BrokenStore {
  type Error = Offline;

  async fn exists(&self, _ebook_id: &str) -> Result<bool, Offline> { Err(Offline) }

  async fn upsert(&self, _record: Record) -> Result<(), Offline> { Err(Offline) }

  async fn upsert_batch(
    &self,
    _records: Vec<Record>,
  ) -> Result<Vec<Result<(), Offline>>, Offline> {
    Err(Offline)
  }
}

#[tokio::test]
async fn failed_batches_and_existence_checks_are_recorded_per_document() {
  let dir = tempfile::tempdir().unwrap();
  let paths = vec![
    write_doc(dir.path(), "pg1.rdf", &rdf("1", "One", "A, B")),
    write_doc(dir.path(), "pg2.rdf", &rdf("2", "Two", "A, B")),
    write_doc(dir.path(), "pg3.rdf", &rdf("3", "Three", "A, B")),
  ];

  let summary = Importer::new(Arc::new(BrokenStore), config(2, 2, true))
    .unwrap()
    .run(paths)
    .await;

  assert_eq!(summary.skipped, 0);
  assert_eq!(summary.succeeded, 0);
  assert_eq!(summary.failures.persist, 3);
  assert!(summary.recent_errors.iter().all(|e| e.contains("store is offline")));
}

// ─── Sources ─────────────────────────────────────────────────────────────────

fn tar_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
  let mut builder = tar::Builder::new(Vec::new());
  for (name, body) in entries {
    let mut header = tar::Header::new_gnu();
    header.set_size(body.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, name, body.as_bytes()).unwrap();
  }
  builder.into_inner().unwrap()
}

fn gzip(bytes: &[u8]) -> Vec<u8> {
  let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
  enc.write_all(bytes).unwrap();
  enc.finish().unwrap()
}

fn write_zip(path: &Path, entries: &[(&str, Vec<u8>)]) {
  let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
  for (name, body) in entries {
    zip
      .start_file(*name, zip::write::SimpleFileOptions::default())
      .unwrap();
    zip.write_all(body).unwrap();
  }
  zip.finish().unwrap();
}

fn catalog_tar() -> Vec<u8> {
  tar_bytes(&[
    ("cache/epub/2/pg2.rdf", rdf("2", "Two", "A, B").as_str()),
    ("cache/epub/1/pg1.rdf", rdf("1", "One", "A, B").as_str()),
    ("cache/README.txt", "not a document"),
  ])
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
  paths
    .iter()
    .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
    .collect()
}

#[test]
fn zip_of_gzipped_tar_stages_persistently_once() {
  let dir = tempfile::tempdir().unwrap();
  let archive = dir.path().join("rdf-files.tar.zip");
  write_zip(
    &archive,
    &[("notes.txt", b"hi".to_vec()), ("rdf-files.tar.gz", gzip(&catalog_tar()))],
  );

  let source = ArchiveSource::new(&archive, StagingMode::Persistent);
  let staged = source.stage().unwrap();
  assert_eq!(
    file_names(staged.paths()),
    ["cache_epub_1_pg1.rdf", "cache_epub_2_pg2.rdf"]
  );
  assert!(staged.paths().iter().all(|p| p.is_absolute()));
  assert!(staged.paths()[0].starts_with(source.staging_dir()));
  let first = staged.paths().to_vec();
  staged.release().unwrap();

  // A second stage reuses the staged files instead of extracting again.
  fs::write(&first[0], "edited").unwrap();
  let again = source.stage().unwrap();
  assert_eq!(again.paths(), first.as_slice());
  assert_eq!(fs::read_to_string(&first[0]).unwrap(), "edited");
  again.release().unwrap();
  assert!(source.staging_dir().is_dir());
}

#[test]
fn bare_tar_stages_into_temporary_dir_removed_on_release() {
  let dir = tempfile::tempdir().unwrap();
  let archive = dir.path().join("rdf-files.tar");
  fs::write(&archive, catalog_tar()).unwrap();

  let staged = ArchiveSource::new(&archive, StagingMode::Temporary)
    .stage()
    .unwrap();
  assert_eq!(staged.len(), 2);
  let staging = staged.paths()[0].parent().unwrap().to_path_buf();
  assert!(staging.is_dir());

  staged.release().unwrap();
  assert!(!staging.exists());
}

#[test]
fn zip_without_tar_is_a_source_error() {
  let dir = tempfile::tempdir().unwrap();
  let archive = dir.path().join("empty.zip");
  write_zip(&archive, &[("readme.txt", b"nothing".to_vec())]);

  let err = ArchiveSource::new(&archive, StagingMode::Temporary)
    .stage()
    .unwrap_err();
  assert!(matches!(err, Error::Source(_)));
}

#[test]
fn archive_without_documents_is_a_source_error() {
  let dir = tempfile::tempdir().unwrap();
  let archive = dir.path().join("rdf-files.tar.zip");
  write_zip(
    &archive,
    &[("rdf-files.tar", tar_bytes(&[("cache/README.txt", "not a document")]))],
  );

  let source = ArchiveSource::new(&archive, StagingMode::Persistent);
  let err = source.stage().unwrap_err();
  assert!(matches!(err, Error::Source(ref m) if m.contains("no RDF documents")));
  assert!(!source.staging_dir().exists());

  let err = ArchiveSource::new(&archive, StagingMode::Temporary)
    .stage()
    .unwrap_err();
  assert!(matches!(err, Error::Source(_)));
}

#[test]
fn directory_without_documents_is_a_source_error() {
  let dir = tempfile::tempdir().unwrap();
  write_doc(dir.path(), "notes.txt", "");
  assert!(matches!(
    DirectorySource::new(dir.path()).stage(),
    Err(Error::Source(_))
  ));
}

#[test]
fn missing_archive_is_a_source_error() {
  let err = ArchiveSource::new("/nonexistent/rdf-files.tar.zip", StagingMode::Persistent)
    .stage()
    .unwrap_err();
  assert!(matches!(err, Error::Source(_)));
}

#[test]
fn directory_source_walks_recursively() {
  let dir = tempfile::tempdir().unwrap();
  fs::create_dir_all(dir.path().join("b/nested")).unwrap();
  write_doc(dir.path(), "a.rdf", "");
  write_doc(&dir.path().join("b/nested"), "c.rdf", "");
  write_doc(dir.path(), "notes.txt", "");

  let staged = DirectorySource::new(dir.path()).stage().unwrap();
  assert_eq!(file_names(staged.paths()), ["a.rdf", "c.rdf"]);
  staged.release().unwrap();
  assert!(dir.path().join("a.rdf").exists());
}

#[test]
fn directory_source_requires_a_directory() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_doc(dir.path(), "a.rdf", "");
  assert!(matches!(
    DirectorySource::new(file).stage(),
    Err(Error::Source(_))
  ));
}

#[tokio::test]
async fn staged_archive_imports_end_to_end() {
  let dir = tempfile::tempdir().unwrap();
  let archive = dir.path().join("rdf-files.tar.zip");
  write_zip(&archive, &[("rdf-files.tar", catalog_tar())]);

  let staged = ArchiveSource::new(&archive, StagingMode::Temporary)
    .stage()
    .unwrap();
  let s = store().await;
  let summary = Importer::new(Arc::clone(&s), ImportConfig::default())
    .unwrap()
    .run(staged.paths().to_vec())
    .await;
  staged.release().unwrap();

  assert_eq!(summary.succeeded, 2);
  assert!(s.exists("1").await.unwrap());
  assert!(s.exists("2").await.unwrap());
}
