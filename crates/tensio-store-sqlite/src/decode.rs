//! Decoding helpers between SQLite's plain-text columns and Rust domain
//! types.
//!
//! Timestamps are stored as RFC 3339 strings, `focus_date` as a bare ISO
//! date, and `metadata` as compact JSON.

use chrono::{DateTime, NaiveDate, Utc};
use tensio_core::record::PredictionRecord;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Column order shared by every `SELECT` over `predictions`.
pub const COLUMNS: &str = "id, region, area_label, year, percentage, priority, \
                           latitude, longitude, predicted_route, focus_month, \
                           focus_date, is_archived, metadata, created_at, updated_at";

/// Raw values read directly from a `predictions` row.
pub struct RawPrediction {
  pub id:              i64,
  pub region:          String,
  pub area_label:      Option<String>,
  pub year:            i32,
  pub percentage:      Option<f64>,
  pub priority:        Option<String>,
  pub latitude:        Option<f64>,
  pub longitude:       Option<f64>,
  pub predicted_route: Option<String>,
  pub focus_month:     Option<String>,
  pub focus_date:      Option<String>,
  pub is_archived:     bool,
  pub metadata:        String,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawPrediction {
  /// Build a `RawPrediction` from a row selected with [`COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      region:          row.get(1)?,
      area_label:      row.get(2)?,
      year:            row.get(3)?,
      percentage:      row.get(4)?,
      priority:        row.get(5)?,
      latitude:        row.get(6)?,
      longitude:       row.get(7)?,
      predicted_route: row.get(8)?,
      focus_month:     row.get(9)?,
      focus_date:      row.get(10)?,
      is_archived:     row.get(11)?,
      metadata:        row.get(12)?,
      created_at:      row.get(13)?,
      updated_at:      row.get(14)?,
    })
  }

  pub fn into_record(self) -> Result<PredictionRecord> {
    let focus_date = self.focus_date.as_deref().map(decode_date).transpose()?;
    let metadata: serde_json::Value = serde_json::from_str(&self.metadata)?;

    Ok(PredictionRecord {
      id:              self.id,
      region:          self.region,
      area_label:      self.area_label,
      year:            self.year,
      percentage:      self.percentage,
      priority:        self.priority,
      latitude:        self.latitude,
      longitude:       self.longitude,
      predicted_route: self.predicted_route,
      focus_month:     self.focus_month,
      focus_date,
      is_archived:     self.is_archived,
      metadata,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}
