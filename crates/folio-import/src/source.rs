//! Document sources: turn an archive or directory into a list of RDF files.
//!
//! Supported archive layouts:
//!   catalog.zip ─┬─ rdf-files.tar      (first tar-like entry is used)
//!                └─ rdf-files.tar.gz / .tgz
//!   rdf-files.tar, rdf-files.tar.gz, rdf-files.tgz
//!
//! Only `.rdf` entries are staged, each under a flat name derived from its
//! path inside the tar.

use std::{
  fs::{self, File},
  io::{self, Read},
  path::{Path, PathBuf},
};

use flate2::read::GzDecoder;
use serde::Deserialize;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::error::{Error, Result};

const RDF_EXTENSION: &str = "rdf";

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Something that can produce the documents of an import run.
pub trait DocumentSource {
  /// Make the documents available on disk. Blocking. Finding no documents
  /// at all is an error.
  fn stage(&self) -> Result<StagedDocuments>;
}

/// Absolute, sorted document paths plus whatever keeps them alive.
///
/// Call [`release`](Self::release) once the run is over; it consumes the
/// handle, so it cannot run twice.
#[derive(Debug)]
pub struct StagedDocuments {
  paths:   Vec<PathBuf>,
  scratch: Option<TempDir>,
}

impl StagedDocuments {
  fn new(paths: Vec<PathBuf>, scratch: Option<TempDir>) -> Self { Self { paths, scratch } }

  pub fn paths(&self) -> &[PathBuf] { &self.paths }

  pub fn len(&self) -> usize { self.paths.len() }

  pub fn is_empty(&self) -> bool { self.paths.is_empty() }

  /// Remove temporary staging, if any. Persistent staging is kept.
  pub fn release(self) -> Result<()> {
    if let Some(scratch) = self.scratch {
      let dir = scratch.path().to_path_buf();
      scratch.close()?;
      tracing::debug!(dir = %dir.display(), "removed temporary staging");
    }
    Ok(())
  }
}

// ─── Archive source ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagingMode {
  /// Extract once into `<archive-stem>-extracted` beside the archive and
  /// reuse it on later runs.
  #[default]
  Persistent,
  /// Extract into a temporary directory removed on release.
  Temporary,
}

#[derive(Debug, Clone)]
pub struct ArchiveSource {
  archive: PathBuf,
  mode:    StagingMode,
}

impl ArchiveSource {
  pub fn new(archive: impl Into<PathBuf>, mode: StagingMode) -> Self {
    Self { archive: archive.into(), mode }
  }

  /// Where persistent staging puts the documents.
  pub fn staging_dir(&self) -> PathBuf {
    let stem = self
      .archive
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| "archive".to_owned());
    self.parent_dir().join(format!("{stem}-extracted"))
  }

  fn parent_dir(&self) -> PathBuf {
    match self.archive.parent() {
      Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
      _ => PathBuf::from("."),
    }
  }

  fn stage_persistent(&self) -> Result<StagedDocuments> {
    let dir = self.staging_dir();
    let existing = collect_rdf(&dir)?;
    if !existing.is_empty() {
      tracing::info!(
        dir = %dir.display(),
        documents = existing.len(),
        "reusing previously extracted documents"
      );
      return Ok(StagedDocuments::new(existing, None));
    }

    // Extract beside the final location, then rename into place.
    let scratch = tempfile::Builder::new()
      .prefix(".folio-staging-")
      .tempdir_in(self.parent_dir())?;
    let extracted = extract_archive(&self.archive, scratch.path())?;
    if extracted == 0 {
      return Err(no_documents(&self.archive));
    }

    if dir.exists() {
      fs::remove_dir_all(&dir)?;
    }
    fs::rename(scratch.path(), &dir)?;
    tracing::info!(dir = %dir.display(), documents = extracted, "extracted archive");

    Ok(StagedDocuments::new(collect_rdf(&dir)?, None))
  }

  fn stage_temporary(&self) -> Result<StagedDocuments> {
    let scratch = tempfile::Builder::new().prefix("folio-").tempdir()?;
    let extracted = extract_archive(&self.archive, scratch.path())?;
    tracing::info!(
      dir = %scratch.path().display(),
      documents = extracted,
      "extracted archive into temporary staging"
    );
    let paths = collect_rdf(scratch.path())?;
    Ok(StagedDocuments::new(paths, Some(scratch)))
  }
}

impl DocumentSource for ArchiveSource {
  fn stage(&self) -> Result<StagedDocuments> {
    if !self.archive.is_file() {
      return Err(Error::Source(format!(
        "archive {} does not exist",
        self.archive.display()
      )));
    }
    let staged = match self.mode {
      StagingMode::Persistent => self.stage_persistent()?,
      StagingMode::Temporary => self.stage_temporary()?,
    };
    if staged.is_empty() {
      return Err(no_documents(&self.archive));
    }
    Ok(staged)
  }
}

// ─── Directory source ────────────────────────────────────────────────────────

/// Documents already on disk, found recursively under `root`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
  root: PathBuf,
}

impl DirectorySource {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }
}

impl DocumentSource for DirectorySource {
  fn stage(&self) -> Result<StagedDocuments> {
    if !self.root.is_dir() {
      return Err(Error::Source(format!(
        "{} is not a directory",
        self.root.display()
      )));
    }
    let paths = collect_rdf(&self.root)?;
    if paths.is_empty() {
      return Err(no_documents(&self.root));
    }
    Ok(StagedDocuments::new(paths, None))
  }
}

fn no_documents(origin: &Path) -> Error {
  Error::Source(format!("no RDF documents found in {}", origin.display()))
}

// ─── Extraction ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TarKind {
  Plain,
  Gzip,
}

impl TarKind {
  fn of(name: &str) -> Option<Self> {
    let name = name.to_ascii_lowercase();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
      Some(Self::Gzip)
    } else if name.ends_with(".tar") {
      Some(Self::Plain)
    } else {
      None
    }
  }

  fn reader<'a, R: Read + 'a>(self, inner: R) -> Box<dyn Read + 'a> {
    match self {
      Self::Plain => Box::new(inner),
      Self::Gzip => Box::new(GzDecoder::new(inner)),
    }
  }
}

/// Extract the `.rdf` entries of `archive` into `dest`; returns how many.
fn extract_archive(archive: &Path, dest: &Path) -> Result<usize> {
  let name = archive.to_string_lossy();
  if let Some(kind) = TarKind::of(&name) {
    return extract_tar(kind.reader(File::open(archive)?), dest);
  }

  let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
  let (inner, kind) = zip
    .file_names()
    .find_map(|n| TarKind::of(n).map(|k| (n.to_owned(), k)))
    .ok_or_else(|| {
      Error::Source(format!("no tar archive found inside {}", archive.display()))
    })?;
  tracing::debug!(entry = %inner, "reading tar from zip");
  let entry = zip.by_name(&inner)?;
  extract_tar(kind.reader(entry), dest)
}

fn extract_tar(reader: impl Read, dest: &Path) -> Result<usize> {
  let mut tar = tar::Archive::new(reader);
  let mut extracted = 0;
  for entry in tar.entries()? {
    let mut entry = entry?;
    if !entry.header().entry_type().is_file() {
      continue;
    }
    let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
    if !name.ends_with(".rdf") {
      continue;
    }
    let mut out = File::create(dest.join(flatten_entry_name(&name)))?;
    io::copy(&mut entry, &mut out)?;
    extracted += 1;
  }
  Ok(extracted)
}

/// `cache/epub/84/pg84.rdf` → `cache_epub_84_pg84.rdf`.
fn flatten_entry_name(name: &str) -> String {
  name
    .trim_start_matches("./")
    .replace(['/', '\\'], "_")
}

/// Absolute paths of every `.rdf` file under `dir`, sorted. A missing
/// directory holds no documents.
fn collect_rdf(dir: &Path) -> Result<Vec<PathBuf>> {
  if !dir.is_dir() {
    return Ok(Vec::new());
  }
  let mut paths = Vec::new();
  for entry in WalkDir::new(dir) {
    let entry = entry?;
    let is_rdf = entry
      .path()
      .extension()
      .is_some_and(|ext| ext == RDF_EXTENSION);
    if entry.file_type().is_file() && is_rdf {
      paths.push(std::path::absolute(entry.path())?);
    }
  }
  paths.sort();
  Ok(paths)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn entry_names_are_flattened() {
    assert_eq!(flatten_entry_name("cache/epub/84/pg84.rdf"), "cache_epub_84_pg84.rdf");
    assert_eq!(flatten_entry_name("./cache/epub/1/pg1.rdf"), "cache_epub_1_pg1.rdf");
    assert_eq!(flatten_entry_name(r"win\style\pg2.rdf"), "win_style_pg2.rdf");
  }

  #[test]
  fn tar_kinds_by_name() {
    assert_eq!(TarKind::of("rdf-files.tar"), Some(TarKind::Plain));
    assert_eq!(TarKind::of("rdf-files.tar.gz"), Some(TarKind::Gzip));
    assert_eq!(TarKind::of("RDF-FILES.TGZ"), Some(TarKind::Gzip));
    assert_eq!(TarKind::of("rdf-files.tar.zip"), None);
  }

  #[test]
  fn staging_dir_sits_beside_archive() {
    let source = ArchiveSource::new("/data/rdf-files.tar.zip", StagingMode::Persistent);
    assert_eq!(source.staging_dir(), PathBuf::from("/data/rdf-files.tar-extracted"));

    let source = ArchiveSource::new("rdf-files.tar.zip", StagingMode::Persistent);
    assert_eq!(source.staging_dir(), PathBuf::from("./rdf-files.tar-extracted"));
  }
}
