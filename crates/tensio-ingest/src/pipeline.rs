//! Pipeline orchestration and resolved file locations.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use tensio_core::store::PredictionStore;

use crate::{
  Error, Result,
  archive::archive_existing,
  convert::{DatasetKind, normalize_to},
  predictor::Predictor,
  reconcile::{extract_batch_year, parse_output_rows},
};

/// Default bound on the external predictor's run time.
pub const DEFAULT_PREDICTOR_TIMEOUT: Duration = Duration::from_secs(3600);

// ─── Paths ───────────────────────────────────────────────────────────────────

/// Resolved file locations for one pipeline instance.
///
/// Injected configuration, never ambient globals — tests run against
/// isolated temp directories.
#[derive(Debug, Clone)]
pub struct IngestPaths {
  /// The canonical input dataset the predictor reads.
  pub canonical_dataset: PathBuf,
  /// Where superseded canonical datasets are moved.
  pub archive_dir:       PathBuf,
  /// Static geographic reference file, passed through to the predictor.
  pub geo_reference:     PathBuf,
  /// Where the predictor writes its output CSV.
  pub output_dataset:    PathBuf,
  /// Bound on the predictor's execution time.
  pub timeout:           Duration,
}

impl IngestPaths {
  /// Conventional layout under a single data directory:
  /// `ml_input/dataset.csv`, `ml_archive/`, `ml_output/predictions.csv`.
  pub fn under(data_dir: &Path, geo_reference: PathBuf) -> Self {
    Self {
      canonical_dataset: data_dir.join("ml_input").join("dataset.csv"),
      archive_dir:       data_dir.join("ml_archive"),
      geo_reference,
      output_dataset:    data_dir.join("ml_output").join("predictions.csv"),
      timeout:           DEFAULT_PREDICTOR_TIMEOUT,
    }
  }
}

/// Summary of a completed ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct IngestReport {
  pub batch_year: i32,
  /// Rows upserted from the output dataset.
  pub upserted:   u64,
  /// Previously stored rows flagged archived because their year differs.
  pub archived:   u64,
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// The four-stage ingestion pipeline.
///
/// Single-threaded and sequential per invocation; the predictor wait is the
/// only suspension point. Concurrent invocations are not coordinated here —
/// the API layer serializes triggers.
pub struct IngestPipeline<P: Predictor> {
  paths:     IngestPaths,
  predictor: P,
}

impl<P: Predictor> IngestPipeline<P> {
  pub fn new(paths: IngestPaths, predictor: P) -> Self {
    Self { paths, predictor }
  }

  pub fn paths(&self) -> &IngestPaths {
    &self.paths
  }

  /// Stages 1–2: normalize an uploaded file and install it as the
  /// canonical dataset, preserving the previous one.
  ///
  /// Conversion is staged next to the canonical location first, so a
  /// malformed upload aborts before archival touches anything and the
  /// canonical file is only ever replaced by a complete dataset.
  pub fn install_dataset(&self, uploaded: &Path, kind: DatasetKind) -> Result<()> {
    let canonical = &self.paths.canonical_dataset;
    if let Some(parent) = canonical.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let staged = canonical.with_extension("csv.staged");
    normalize_to(uploaded, kind, &staged)?;

    archive_existing(canonical, &self.paths.archive_dir)?;
    std::fs::rename(&staged, canonical)?;

    tracing::info!(dataset = %canonical.display(), "canonical dataset installed");
    Ok(())
  }

  /// Stages 3–4: run the predictor on the canonical dataset and reconcile
  /// its output into `store`.
  pub async fn run<S>(&self, store: &S) -> Result<IngestReport>
  where
    S: PredictionStore,
  {
    let paths = &self.paths;

    if !paths.canonical_dataset.exists() {
      return Err(Error::InputMissing(paths.canonical_dataset.clone()));
    }
    if !paths.geo_reference.exists() {
      return Err(Error::ReferenceMissing(paths.geo_reference.clone()));
    }
    if let Some(parent) = paths.output_dataset.parent() {
      std::fs::create_dir_all(parent)?;
    }

    self
      .predictor
      .run(
        &paths.canonical_dataset,
        &paths.geo_reference,
        &paths.output_dataset,
        paths.timeout,
      )
      .await?;

    // A clean exit without the promised output file is still a failure.
    if !paths.output_dataset.exists() {
      return Err(Error::PredictionFailed(format!(
        "predictor produced no output at {}",
        paths.output_dataset.display()
      )));
    }

    // Year detection runs against the INPUT dataset and guards every
    // storage mutation.
    let batch_year = extract_batch_year(&paths.canonical_dataset)?;
    let rows = parse_output_rows(&paths.output_dataset, batch_year)?;
    let row_count = rows.len();

    let outcome = store
      .apply_batch(batch_year, rows)
      .await
      .map_err(Error::store)?;

    tracing::info!(
      batch_year,
      upserted = outcome.upserted,
      archived = outcome.archived,
      parsed = row_count,
      "ingestion batch reconciled"
    );

    Ok(IngestReport {
      batch_year,
      upserted: outcome.upserted,
      archived: outcome.archived,
    })
  }

  /// The full pipeline: install an uploaded dataset, then predict and
  /// reconcile.
  pub async fn ingest<S>(
    &self,
    uploaded: &Path,
    kind: DatasetKind,
    store: &S,
  ) -> Result<IngestReport>
  where
    S: PredictionStore,
  {
    self.install_dataset(uploaded, kind)?;
    self.run(store).await
  }
}
