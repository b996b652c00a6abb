//! Prediction records — one row per (region, year).
//!
//! A record is the unit the ingestion pipeline upserts and the map/admin
//! grid read. Superseded records are never deleted; a newer ingestion batch
//! flags them `is_archived` so the full history survives.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A stored regional prevalence prediction.
///
/// `(region, year)` is the logical identity; `id` is storage-assigned and
/// only used for addressing rows from the admin grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
  pub id:              i64,
  /// Primary geographic identity (district name).
  pub region:          String,
  /// Broader administrative grouping, when the source provides one.
  pub area_label:      Option<String>,
  pub year:            i32,
  /// Predicted prevalence, expected range 0–100.
  pub percentage:      Option<f64>,
  /// Free-text priority flag ("Priority" | "Not Priority" | other).
  pub priority:        Option<String>,
  pub latitude:        Option<f64>,
  pub longitude:       Option<f64>,
  /// Label for a recommended intervention route.
  pub predicted_route: Option<String>,
  pub focus_month:     Option<String>,
  pub focus_date:      Option<NaiveDate>,
  /// True once a newer ingestion batch has superseded this row.
  pub is_archived:     bool,
  /// The full original output row, kept verbatim for traceability.
  pub metadata:        serde_json::Value,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl PredictionRecord {
  /// A record can be placed on the map only when both coordinates are
  /// present.
  pub fn is_mappable(&self) -> bool {
    self.latitude.is_some() && self.longitude.is_some()
  }
}

/// Input for [`PredictionStore::upsert`](crate::store::PredictionStore::upsert).
///
/// Carries everything but the storage-managed fields (`id`, `is_archived`,
/// timestamps). Every field except the key is independently nullable — a
/// missing source column yields `None`, never a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrediction {
  pub region:          String,
  pub year:            i32,
  pub area_label:      Option<String>,
  pub percentage:      Option<f64>,
  pub priority:        Option<String>,
  pub latitude:        Option<f64>,
  pub longitude:       Option<f64>,
  pub predicted_route: Option<String>,
  pub focus_month:     Option<String>,
  pub focus_date:      Option<NaiveDate>,
  pub metadata:        serde_json::Value,
}

impl NewPrediction {
  /// Reject rows whose key is unusable. Everything else is nullable by
  /// design, so this is the only validation there is.
  pub fn validate(&self) -> crate::Result<()> {
    if self.region.trim().is_empty() {
      return Err(crate::Error::EmptyRegion);
    }
    Ok(())
  }

  /// A bare (region, year) row with every optional field unset.
  pub fn new(region: impl Into<String>, year: i32) -> Self {
    Self {
      region:          region.into(),
      year,
      area_label:      None,
      percentage:      None,
      priority:        None,
      latitude:        None,
      longitude:       None,
      predicted_route: None,
      focus_month:     None,
      focus_date:      None,
      metadata:        serde_json::Value::Null,
    }
  }
}
