//! Result reconciliation — output CSV into durable storage.
//!
//! Pipeline:
//!   input CSV
//!     └─ extract_batch_year()  → authoritative year for the batch
//!   output CSV
//!     └─ parse_output_rows()   → Vec<NewPrediction>
//!          └─ PredictionStore::apply_batch() → stale years archived, rows upserted
//!
//! Coercion is deliberately lenient: the predictor's output is not
//! adversarial, so a non-numeric value in a numeric column becomes `None`
//! rather than rejecting the row or the batch.

use std::{path::Path, str::FromStr};

use chrono::NaiveDate;
use tensio_core::record::NewPrediction;

use crate::{Error, Result};

/// Header of the column holding the prediction year.
const YEAR_COLUMN: &str = "year";
/// Fallback year column used by some source datasets.
const PERIOD_COLUMN: &str = "reporting_period";

// ─── Lenient coercion ────────────────────────────────────────────────────────

/// Parse a numeric field; empty or non-numeric input yields `None`.
fn parse_num<T: FromStr>(raw: &str) -> Option<T> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }
  trimmed.parse().ok()
}

/// Years sometimes arrive as floats ("2024.0"); accept those too.
fn parse_year(raw: &str) -> Option<i32> {
  parse_num::<i32>(raw).or_else(|| parse_num::<f64>(raw).map(|f| f as i32))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// A non-empty string, or `None`.
fn non_empty(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ─── Year detection ──────────────────────────────────────────────────────────

/// Determine the authoritative year for an ingestion batch.
///
/// Scans rows of the *input* (pre-prediction) dataset in order: the first
/// numeric value in a `year` column wins; failing that, the first numeric
/// value in a `reporting_period` column; failing both,
/// [`Error::YearUndetectable`] — checked before any storage mutation, so a
/// dataset with no discernible year leaves prior data untouched.
pub fn extract_batch_year(input: &Path) -> Result<i32> {
  if !input.exists() {
    return Err(Error::InputMissing(input.to_path_buf()));
  }

  let mut reader = csv::Reader::from_path(input)?;
  let headers = reader.headers()?.clone();
  let year_idx = headers.iter().position(|h| h.trim() == YEAR_COLUMN);
  let period_idx = headers.iter().position(|h| h.trim() == PERIOD_COLUMN);

  let mut from_period: Option<i32> = None;
  for record in reader.records() {
    let record = record?;
    if let Some(idx) = year_idx
      && let Some(year) = record.get(idx).and_then(parse_year)
    {
      return Ok(year);
    }
    if from_period.is_none()
      && let Some(idx) = period_idx
      && let Some(year) = record.get(idx).and_then(parse_year)
    {
      from_period = Some(year);
    }
  }

  from_period.ok_or_else(|| Error::YearUndetectable(input.to_path_buf()))
}

// ─── Output parsing ──────────────────────────────────────────────────────────

/// Parse the predictor's output CSV into upsert rows.
///
/// Header-driven; every field except the key is independently nullable.
/// `region` resolves from `region_final` falling back to `region`; rows
/// with neither are skipped with a warning rather than failing the batch.
/// `metadata` captures the full original row for traceability.
pub fn parse_output_rows(output: &Path, batch_year: i32) -> Result<Vec<NewPrediction>> {
  let mut reader = csv::Reader::from_path(output)?;
  let headers = reader.headers()?.clone();

  let col = |name: &str| headers.iter().position(|h| h.trim() == name);
  let field = |record: &csv::StringRecord, idx: Option<usize>| -> Option<String> {
    idx.and_then(|i| record.get(i)).and_then(non_empty)
  };

  let region_final_idx = col("region_final");
  let region_idx       = col("region");
  let year_idx         = col(YEAR_COLUMN);
  let period_idx       = col(PERIOD_COLUMN);
  let area_idx         = col("area_label");
  let percentage_idx   = col("percentage");
  let priority_idx     = col("priority");
  let latitude_idx     = col("latitude");
  let longitude_idx    = col("longitude");
  let route_idx        = col("predicted_route");
  let focus_month_idx  = col("focus_month");
  let focus_date_idx   = col("focus_date");

  let mut rows = Vec::new();
  for (line, record) in reader.records().enumerate() {
    let record = record?;

    let Some(region) =
      field(&record, region_final_idx).or_else(|| field(&record, region_idx))
    else {
      tracing::warn!(line = line + 2, "output row has no region, skipping");
      continue;
    };

    let year = field(&record, year_idx)
      .as_deref()
      .and_then(parse_year)
      .or_else(|| field(&record, period_idx).as_deref().and_then(parse_year))
      .unwrap_or(batch_year);

    let metadata = serde_json::Value::Object(
      headers
        .iter()
        .zip(record.iter())
        .map(|(h, v)| (h.to_string(), serde_json::Value::String(v.to_string())))
        .collect(),
    );

    rows.push(NewPrediction {
      region,
      year,
      area_label:      field(&record, area_idx),
      percentage:      field(&record, percentage_idx).as_deref().and_then(parse_num),
      priority:        field(&record, priority_idx),
      latitude:        field(&record, latitude_idx).as_deref().and_then(parse_num),
      longitude:       field(&record, longitude_idx).as_deref().and_then(parse_num),
      predicted_route: field(&record, route_idx),
      focus_month:     field(&record, focus_month_idx),
      focus_date:      field(&record, focus_date_idx).as_deref().and_then(parse_date),
      metadata,
    });
  }

  Ok(rows)
}
