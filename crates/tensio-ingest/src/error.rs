//! Error taxonomy for the ingestion pipeline.
//!
//! Every variant is fatal to the current invocation; the caller decides
//! whether to surface it to an operator for a manual retry. Field-level
//! coercion problems during reconciliation are NOT errors — they are
//! recovered locally as `None` (see `reconcile`).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The uploaded source file does not exist.
  #[error("uploaded dataset not found: {0}")]
  FileNotFound(PathBuf),

  /// The uploaded spreadsheet could not be read or converted.
  #[error("spreadsheet conversion failed for {path}: {reason}")]
  ConversionError { path: PathBuf, reason: String },

  /// The canonical dataset is missing at prediction time.
  #[error("canonical input dataset not found: {0}")]
  InputMissing(PathBuf),

  /// The static geographic reference file is missing.
  #[error("geographic reference file not found: {0}")]
  ReferenceMissing(PathBuf),

  /// The external predictor executable is missing.
  #[error("predictor program not found: {0}")]
  PredictorMissing(PathBuf),

  /// The external predictor ran past its configured bound.
  #[error("predictor timed out after {0} seconds")]
  TimeoutExceeded(u64),

  /// The predictor exited non-zero, or exited zero without producing the
  /// output file.
  #[error("prediction failed: {0}")]
  PredictionFailed(String),

  /// Neither a `year` nor a `reporting_period` column yielded a numeric
  /// value on any row of the input dataset. Checked before any storage
  /// mutation, so prior data is left untouched.
  #[error("no batch year detectable in input dataset {0}")]
  YearUndetectable(PathBuf),

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error from the store trait's associated error type.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
