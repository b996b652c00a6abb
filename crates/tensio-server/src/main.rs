//! tensio server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the prediction API over HTTP.
//!
//! The `ingest` subcommand runs the same pipeline from the command line,
//! for operators who prefer a shell to the upload endpoint:
//!
//! ```text
//! tensio ingest --input new_dataset.xlsx
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tensio_api::AppState;
use tensio_ingest::{IngestPaths, IngestPipeline, ProcessPredictor, convert::DatasetKind};
use tensio_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI ─────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Tensio prediction tracking server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default when no subcommand is given).
  Serve,
  /// Run the ingestion pipeline from the command line.
  Ingest {
    /// A new dataset to install as the canonical input first. Without
    /// this, the pipeline runs against the existing canonical dataset.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Override the dataset kind detected from the file extension.
    #[arg(long, value_enum)]
    kind: Option<KindArg>,
  },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
  Csv,
  Spreadsheet,
}

impl From<KindArg> for DatasetKind {
  fn from(kind: KindArg) -> Self {
    match kind {
      KindArg::Csv => DatasetKind::Csv,
      KindArg::Spreadsheet => DatasetKind::Spreadsheet,
    }
  }
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `config.toml` and `TENSIO_*`
/// environment variables.
#[derive(Deserialize, Clone)]
struct ServerConfig {
  #[serde(default = "default_host")]
  host: String,
  #[serde(default = "default_port")]
  port: u16,
  /// SQLite database file.
  #[serde(default = "default_store_path")]
  store_path: PathBuf,
  /// Root for the canonical dataset, archive, and predictor output.
  #[serde(default = "default_data_dir")]
  data_dir: PathBuf,
  /// Static geographic reference file passed to the predictor.
  geo_reference: PathBuf,
  /// The external predictor executable.
  predictor_program: PathBuf,
  #[serde(default = "default_timeout_secs")]
  predictor_timeout_secs: u64,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 3000 }
fn default_store_path() -> PathBuf { PathBuf::from("tensio.db") }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_timeout_secs() -> u64 { 3600 }

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("TENSIO"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open SQLite store.
  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Build the pipeline from resolved paths.
  let mut paths = IngestPaths::under(
    &expand_tilde(&server_cfg.data_dir),
    expand_tilde(&server_cfg.geo_reference),
  );
  paths.timeout = Duration::from_secs(server_cfg.predictor_timeout_secs);
  let predictor = ProcessPredictor::new(expand_tilde(&server_cfg.predictor_program));
  let pipeline = IngestPipeline::new(paths, predictor);

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(server_cfg, store, pipeline).await,
    Command::Ingest { input, kind } => ingest(store, pipeline, input, kind).await,
  }
}

async fn serve(
  cfg: ServerConfig,
  store: SqliteStore,
  pipeline: IngestPipeline<ProcessPredictor>,
) -> anyhow::Result<()> {
  let state = AppState::new(Arc::new(store), Arc::new(pipeline));

  let app = axum::Router::new()
    .nest("/api", tensio_api::api_router(state))
    .layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", cfg.host, cfg.port);
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

async fn ingest(
  store: SqliteStore,
  pipeline: IngestPipeline<ProcessPredictor>,
  input: Option<PathBuf>,
  kind: Option<KindArg>,
) -> anyhow::Result<()> {
  let report = match input {
    Some(input) => {
      let kind = kind
        .map(DatasetKind::from)
        .unwrap_or_else(|| DatasetKind::from_path(&input));
      pipeline.ingest(&input, kind, &store).await?
    }
    None => pipeline.run(&store).await?,
  };

  tracing::info!(
    batch_year = report.batch_year,
    upserted = report.upserted,
    archived = report.archived,
    "ingestion complete"
  );
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
