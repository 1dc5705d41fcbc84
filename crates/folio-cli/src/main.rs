//! `folio`: import Project Gutenberg RDF metadata into a SQLite catalog.
//!
//! # Usage
//!
//! ```text
//! folio import --archive rdf-files.tar.zip --db catalog.db --workers 8
//! folio import --dir ./rdf --resume
//! folio verify --db catalog.db --sample 10
//! folio verify --id 84 --json
//! ```
//!
//! Settings are read from `folio.toml` (or `--config`) and `FOLIO_*`
//! environment variables; flags given here win.

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use folio_import::{ArchiveSource, DirectorySource, DocumentSource, Importer, StagingMode};
use folio_store_sqlite::SqliteStore;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "folio", author, version, about = "Project Gutenberg catalog importer")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "folio.toml")]
  config: PathBuf,

  /// SQLite database file.
  #[arg(long, global = true, value_name = "FILE")]
  db: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Extract and store every document of an archive or directory.
  Import(ImportArgs),
  /// Print table counts and sample records of an existing catalog.
  Verify(VerifyArgs),
}

#[derive(Args)]
struct ImportArgs {
  /// Zip or tar archive holding the RDF documents.
  #[arg(long, value_name = "FILE", conflicts_with = "dir")]
  archive: Option<PathBuf>,

  /// Directory of already extracted RDF documents.
  #[arg(long, value_name = "DIR")]
  dir: Option<PathBuf>,

  /// Records per store call.
  #[arg(long)]
  batch_size: Option<usize>,

  /// Concurrent workers.
  #[arg(long)]
  workers: Option<usize>,

  /// Skip documents whose record is already stored.
  #[arg(long)]
  resume: bool,

  /// Extract into a temporary directory removed after the run.
  #[arg(long)]
  temporary: bool,

  /// Print the summary as JSON.
  #[arg(long)]
  json: bool,
}

#[derive(Args)]
struct VerifyArgs {
  /// Number of sample records to show.
  #[arg(long, default_value_t = 5)]
  sample: usize,

  /// Show one stored record instead of the report.
  #[arg(long, value_name = "EBOOK_ID")]
  id: Option<String>,

  /// Print JSON instead of text.
  #[arg(long)]
  json: bool,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let mut settings = Settings::load(&cli.config)?;
  if let Some(db) = cli.db {
    settings.store_path = settings::expand_tilde(&db);
  }

  match cli.command {
    Command::Import(args) => import(settings, args).await,
    Command::Verify(args) => verify(settings, args).await,
  }
}

async fn import(mut settings: Settings, args: ImportArgs) -> anyhow::Result<()> {
  if let Some(n) = args.batch_size {
    settings.batch_size = n;
  }
  if let Some(n) = args.workers {
    settings.workers = n;
  }
  settings.resume |= args.resume;
  if args.temporary {
    settings.staging = StagingMode::Temporary;
  }

  let source: Box<dyn DocumentSource + Send> = match (args.dir, args.archive) {
    (Some(dir), _) => Box::new(DirectorySource::new(dir)),
    (None, archive) => Box::new(ArchiveSource::new(
      archive.unwrap_or_else(|| settings.archive.clone()),
      settings.staging,
    )),
  };

  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;
  let importer = Importer::new(Arc::new(store), settings.import_config())
    .context("invalid import settings")?;

  let staged = tokio::task::spawn_blocking(move || source.stage())
    .await
    .context("staging task panicked")?
    .context("failed to stage documents")?;
  tracing::info!(documents = staged.len(), "documents staged");

  let summary = importer.run(staged.paths().to_vec()).await;

  tokio::task::spawn_blocking(move || staged.release())
    .await
    .context("release task panicked")?
    .context("failed to release staged documents")?;

  if args.json {
    println!("{}", serde_json::to_string_pretty(&summary)?);
  } else {
    println!("\n{summary}");
  }
  Ok(())
}

async fn verify(settings: Settings, args: VerifyArgs) -> anyhow::Result<()> {
  let store = SqliteStore::open_read_only(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;

  if let Some(id) = args.id {
    let record = store
      .get_record(&id)
      .await
      .with_context(|| format!("failed to load record {id}"))?
      .with_context(|| format!("no record with ebook id {id}"))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    return Ok(());
  }

  let report = store
    .report(args.sample)
    .await
    .context("failed to build report")?;
  if args.json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print!("{report}");
  }
  Ok(())
}
