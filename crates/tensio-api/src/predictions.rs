//! Handlers for the admin grid's `/predictions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/predictions` | `?year=&priority=&include_archived=&limit=&offset=` |
//! | `POST` | `/predictions` | Body: a [`NewPrediction`]; upsert semantics |
//! | `GET`  | `/predictions/:id` | 404 if not found |
//! | `PUT`  | `/predictions/:id` | Body: a [`NewPrediction`] |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tensio_core::{
  record::{NewPrediction, PredictionRecord},
  store::{PredictionQuery, PredictionStore},
};
use tensio_ingest::Predictor;

use crate::{AppState, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub year:             Option<i32>,
  pub priority:         Option<String>,
  #[serde(default)]
  pub include_archived: bool,
  pub limit:            Option<usize>,
  pub offset:           Option<usize>,
}

/// `GET /predictions`
pub async fn list<S, P>(
  State(state): State<AppState<S, P>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<PredictionRecord>>, ApiError>
where
  S: PredictionStore,
  P: Predictor,
{
  let query = PredictionQuery {
    year:             params.year,
    priority:         params.priority,
    mappable_only:    false,
    include_archived: params.include_archived,
    limit:            params.limit,
    offset:           params.offset,
  };
  let records = state.store.list(&query).await.map_err(ApiError::store)?;
  Ok(Json(records))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /predictions` — manual record creation from the admin grid.
/// Upsert semantics: posting an existing `(region, year)` overwrites it.
pub async fn create<S, P>(
  State(state): State<AppState<S, P>>,
  Json(body): Json<NewPrediction>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PredictionStore,
  P: Predictor,
{
  body.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let record = state.store.upsert(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /predictions/:id`
pub async fn get_one<S, P>(
  State(state): State<AppState<S, P>>,
  Path(id): Path<i64>,
) -> Result<Json<PredictionRecord>, ApiError>
where
  S: PredictionStore,
  P: Predictor,
{
  let record = state
    .store
    .get(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("prediction {id} not found")))?;
  Ok(Json(record))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /predictions/:id` — admin edit.
///
/// The id only addresses the record; the body's `(region, year)` key is
/// what the write targets, so editing those fields moves the record to a
/// new key exactly like the upsert pipeline would.
pub async fn update<S, P>(
  State(state): State<AppState<S, P>>,
  Path(id): Path<i64>,
  Json(body): Json<NewPrediction>,
) -> Result<Json<PredictionRecord>, ApiError>
where
  S: PredictionStore,
  P: Predictor,
{
  state
    .store
    .get(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("prediction {id} not found")))?;

  body.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let record = state.store.upsert(body).await.map_err(ApiError::store)?;
  Ok(Json(record))
}
