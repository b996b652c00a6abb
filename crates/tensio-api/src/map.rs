//! Map-facing endpoints: GeoJSON features, the raw geographic reference
//! file, and the dropdown filter values.

use axum::{
  Json,
  extract::{Query, State},
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tensio_core::{
  record::PredictionRecord,
  store::{PredictionQuery, PredictionStore},
};
use tensio_ingest::Predictor;

use crate::{AppState, error::ApiError};

// ─── Predictions as GeoJSON ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct GeoParams {
  pub year:     Option<i32>,
  pub priority: Option<String>,
}

/// Build a GeoJSON Feature from a mappable record. Returns `None` when a
/// coordinate is missing — those rows never reach the map.
pub fn to_feature(record: &PredictionRecord) -> Option<Value> {
  let (Some(latitude), Some(longitude)) = (record.latitude, record.longitude) else {
    return None;
  };

  Some(json!({
    "type": "Feature",
    "properties": {
      "region": record.region,
      "area_label": record.area_label,
      "year": record.year,
      "percentage": record.percentage,
      "priority": record.priority,
      "predicted_route": record.predicted_route,
      "focus_date": record.focus_date,
    },
    "geometry": {
      "type": "Point",
      "coordinates": [longitude, latitude],
    },
  }))
}

/// `GET /map/predictions` — current mappable rows as a
/// FeatureCollection, optionally filtered by year and priority.
pub async fn predictions_geojson<S, P>(
  State(state): State<AppState<S, P>>,
  Query(params): Query<GeoParams>,
) -> Result<Json<Value>, ApiError>
where
  S: PredictionStore,
  P: Predictor,
{
  let query = PredictionQuery {
    year:          params.year,
    priority:      params.priority,
    mappable_only: true,
    ..Default::default()
  };
  let records = state.store.list(&query).await.map_err(ApiError::store)?;
  let features: Vec<Value> = records.iter().filter_map(to_feature).collect();

  Ok(Json(json!({
    "type": "FeatureCollection",
    "features": features,
  })))
}

// ─── Raw reference file ──────────────────────────────────────────────────────

/// `GET /map/geojson` — the static geographic reference file, served verbatim.
pub async fn reference_geojson<S, P>(
  State(state): State<AppState<S, P>>,
) -> Result<Response, ApiError>
where
  S: PredictionStore,
  P: Predictor,
{
  let path = &state.pipeline.paths().geo_reference;
  match tokio::fs::read(path).await {
    Ok(contents) => Ok(
      (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        contents,
      )
        .into_response(),
    ),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ApiError::NotFound(
      "geographic reference file not found".into(),
    )),
    Err(e) => Err(ApiError::Ingest(e.into())),
  }
}

// ─── Dropdown filters ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Filters {
  pub years:  Vec<i32>,
  pub routes: Vec<String>,
}

/// `GET /filters` — distinct years and routes for the map's dropdowns.
pub async fn filters<S, P>(
  State(state): State<AppState<S, P>>,
) -> Result<Json<Filters>, ApiError>
where
  S: PredictionStore,
  P: Predictor,
{
  let years = state.store.years().await.map_err(ApiError::store)?;
  let routes = state.store.routes().await.map_err(ApiError::store)?;
  Ok(Json(Filters { years, routes }))
}
