//! Error type for `tensio-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// An upsert reported success but the row could not be read back.
  #[error("record for region {region:?} year {year} vanished after write")]
  RowVanished { region: String, year: i32 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
