//! [`SqliteStore`] — the SQLite implementation of [`PredictionStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use tensio_core::{
  record::{NewPrediction, PredictionRecord},
  store::{BatchOutcome, PredictionQuery, PredictionStore},
};

use crate::{
  Error, Result,
  decode::{COLUMNS, RawPrediction, encode_date, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tensio prediction store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Encoded row ─────────────────────────────────────────────────────────────

/// A [`NewPrediction`] with every structured field pre-encoded to the
/// plain-text form SQLite stores, so the connection closure stays
/// infallible with respect to serialisation.
struct EncodedPrediction {
  region:          String,
  year:            i32,
  area_label:      Option<String>,
  percentage:      Option<f64>,
  priority:        Option<String>,
  latitude:        Option<f64>,
  longitude:       Option<f64>,
  predicted_route: Option<String>,
  focus_month:     Option<String>,
  focus_date:      Option<String>,
  metadata:        String,
}

fn encode_prediction(input: &NewPrediction) -> Result<EncodedPrediction> {
  Ok(EncodedPrediction {
    region:          input.region.clone(),
    year:            input.year,
    area_label:      input.area_label.clone(),
    percentage:      input.percentage,
    priority:        input.priority.clone(),
    latitude:        input.latitude,
    longitude:       input.longitude,
    predicted_route: input.predicted_route.clone(),
    focus_month:     input.focus_month.clone(),
    focus_date:      input.focus_date.map(encode_date),
    metadata:        serde_json::to_string(&input.metadata)?,
  })
}

/// Insert or overwrite the row for `(region, year)`.
///
/// `created_at` is preserved on conflict; `is_archived` is explicitly reset
/// — a row present in the new batch is by definition current.
fn upsert_row(
  conn: &rusqlite::Connection,
  row: &EncodedPrediction,
  now: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO predictions (
       region, area_label, year, percentage, priority,
       latitude, longitude, predicted_route, focus_month, focus_date,
       is_archived, metadata, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11, ?12, ?12)
     ON CONFLICT(region, year) DO UPDATE SET
       area_label      = excluded.area_label,
       percentage      = excluded.percentage,
       priority        = excluded.priority,
       latitude        = excluded.latitude,
       longitude       = excluded.longitude,
       predicted_route = excluded.predicted_route,
       focus_month     = excluded.focus_month,
       focus_date      = excluded.focus_date,
       is_archived     = 0,
       metadata        = excluded.metadata,
       updated_at      = excluded.updated_at",
    rusqlite::params![
      row.region,
      row.area_label,
      row.year,
      row.percentage,
      row.priority,
      row.latitude,
      row.longitude,
      row.predicted_route,
      row.focus_month,
      row.focus_date,
      row.metadata,
      now,
    ],
  )?;
  Ok(())
}

fn select_by_key(
  conn: &rusqlite::Connection,
  region: &str,
  year: i32,
) -> rusqlite::Result<Option<RawPrediction>> {
  conn
    .query_row(
      &format!("SELECT {COLUMNS} FROM predictions WHERE region = ?1 AND year = ?2"),
      rusqlite::params![region, year],
      |row| RawPrediction::from_row(row),
    )
    .optional()
}

// ─── PredictionStore impl ────────────────────────────────────────────────────

impl PredictionStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn upsert(&self, input: NewPrediction) -> Result<PredictionRecord> {
    let encoded = encode_prediction(&input)?;
    let now_str = encode_dt(Utc::now());

    let raw: Option<RawPrediction> = self
      .conn
      .call(move |conn| {
        upsert_row(conn, &encoded, &now_str)?;
        Ok(select_by_key(conn, &encoded.region, encoded.year)?)
      })
      .await?;

    let raw = raw.ok_or(Error::RowVanished {
      region: input.region,
      year:   input.year,
    })?;
    raw.into_record()
  }

  async fn apply_batch(
    &self,
    batch_year: i32,
    rows: Vec<NewPrediction>,
  ) -> Result<BatchOutcome> {
    let encoded: Vec<EncodedPrediction> =
      rows.iter().map(encode_prediction).collect::<Result<_>>()?;
    let now_str = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Unconditional bulk archive of every other year, before any
        // upsert — a crash can no longer leave a partial split.
        let archived = tx.execute(
          "UPDATE predictions SET is_archived = 1, updated_at = ?1 WHERE year != ?2",
          rusqlite::params![now_str, batch_year],
        )? as u64;

        for row in &encoded {
          upsert_row(&tx, row, &now_str)?;
        }
        let upserted = encoded.len() as u64;

        tx.commit()?;
        Ok(BatchOutcome { archived, upserted })
      })
      .await?;

    Ok(outcome)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get(&self, id: i64) -> Result<Option<PredictionRecord>> {
    let raw: Option<RawPrediction> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {COLUMNS} FROM predictions WHERE id = ?1"),
              rusqlite::params![id],
              |row| RawPrediction::from_row(row),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPrediction::into_record).transpose()
  }

  async fn find(&self, region: &str, year: i32) -> Result<Option<PredictionRecord>> {
    let region = region.to_owned();

    let raw: Option<RawPrediction> = self
      .conn
      .call(move |conn| Ok(select_by_key(conn, &region, year)?))
      .await?;

    raw.map(RawPrediction::into_record).transpose()
  }

  async fn list(&self, query: &PredictionQuery) -> Result<Vec<PredictionRecord>> {
    let year             = query.year;
    let priority         = query.priority.clone();
    let mappable_only    = query.mappable_only;
    let include_archived = query.include_archived;
    let limit_val        = query.limit.unwrap_or(500) as i64;
    let offset_val       = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawPrediction> = self
      .conn
      .call(move |conn| {
        // Build WHERE clause dynamically.
        let mut conds: Vec<String> = vec![];
        let mut binds: Vec<Box<dyn rusqlite::ToSql>> = vec![];

        if let Some(y) = year {
          binds.push(Box::new(y));
          conds.push(format!("year = ?{}", binds.len()));
        }
        if let Some(p) = priority {
          binds.push(Box::new(p));
          conds.push(format!("priority = ?{}", binds.len()));
        }
        if mappable_only {
          conds.push("latitude IS NOT NULL AND longitude IS NOT NULL".into());
        }
        if !include_archived {
          conds.push("is_archived = 0".into());
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        binds.push(Box::new(limit_val));
        let limit_idx = binds.len();
        binds.push(Box::new(offset_val));
        let offset_idx = binds.len();

        let sql = format!(
          "SELECT {COLUMNS} FROM predictions
           {where_clause}
           ORDER BY region, year
           LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params_from_iter(binds.iter().map(|b| b.as_ref())),
            |row| RawPrediction::from_row(row),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPrediction::into_record).collect()
  }

  async fn years(&self) -> Result<Vec<i32>> {
    let years = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT year FROM predictions
           WHERE is_archived = 0
           ORDER BY year",
        )?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<i32>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(years)
  }

  async fn routes(&self) -> Result<Vec<String>> {
    let routes = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT predicted_route FROM predictions
           WHERE is_archived = 0 AND predicted_route IS NOT NULL
           ORDER BY predicted_route",
        )?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(routes)
  }
}
