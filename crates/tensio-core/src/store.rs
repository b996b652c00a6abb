//! The `PredictionStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `tensio-store-sqlite`).
//! Higher layers (`tensio-ingest`, `tensio-api`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use crate::record::{NewPrediction, PredictionRecord};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`PredictionStore::list`].
#[derive(Debug, Clone, Default)]
pub struct PredictionQuery {
  /// Restrict to a single prediction year.
  pub year:             Option<i32>,
  /// Restrict to an exact priority label (e.g. `"Priority"`).
  pub priority:         Option<String>,
  /// Only rows with both coordinates present (the map view).
  pub mappable_only:    bool,
  /// Include rows superseded by a newer batch. Defaults to current-only.
  pub include_archived: bool,
  pub limit:            Option<usize>,
  pub offset:           Option<usize>,
}

/// Result of [`PredictionStore::apply_batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
  /// Rows flagged archived because their year differs from the batch year.
  pub archived: u64,
  /// Rows inserted or overwritten from the batch.
  pub upserted: u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Tensio prediction store backend.
///
/// Writes are upsert-only, keyed on `(region, year)`; rows are never
/// deleted. Supersession is expressed by flagging `is_archived`.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PredictionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert or overwrite the record for `(input.region, input.year)`.
  ///
  /// On conflict every mutable field is replaced, `is_archived` is reset
  /// to `false`, `updated_at` advances, and `created_at` is preserved.
  fn upsert(
    &self,
    input: NewPrediction,
  ) -> impl Future<Output = Result<PredictionRecord, Self::Error>> + Send + '_;

  /// Reconcile one ingestion batch in a single transaction: flag every
  /// stored record whose year differs from `batch_year` as archived, then
  /// upsert each row of the batch.
  fn apply_batch(
    &self,
    batch_year: i32,
    rows: Vec<NewPrediction>,
  ) -> impl Future<Output = Result<BatchOutcome, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a record by storage id. Returns `None` if not found.
  fn get(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<PredictionRecord>, Self::Error>> + Send + '_;

  /// Retrieve the record for a `(region, year)` key, if any.
  fn find<'a>(
    &'a self,
    region: &'a str,
    year: i32,
  ) -> impl Future<Output = Result<Option<PredictionRecord>, Self::Error>> + Send + 'a;

  /// List records matching `query`, ordered by region then year.
  fn list<'a>(
    &'a self,
    query: &'a PredictionQuery,
  ) -> impl Future<Output = Result<Vec<PredictionRecord>, Self::Error>> + Send + 'a;

  /// Distinct prediction years among current (non-archived) rows, for the
  /// map's year dropdown.
  fn years(
    &self,
  ) -> impl Future<Output = Result<Vec<i32>, Self::Error>> + Send + '_;

  /// Distinct predicted routes among current rows, for the map's route
  /// dropdown.
  fn routes(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;
}
