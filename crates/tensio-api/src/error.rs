//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("ingestion error: {0}")]
  Ingest(#[from] tensio_ingest::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    use tensio_ingest::Error as Ingest;

    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Ingest(e) => {
        let status = match e {
          // Operator-fixable input problems.
          Ingest::FileNotFound(_)
          | Ingest::InputMissing(_)
          | Ingest::ConversionError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
          Ingest::YearUndetectable(_) => StatusCode::UNPROCESSABLE_ENTITY,
          // Deployment problems.
          Ingest::ReferenceMissing(_) | Ingest::PredictorMissing(_) => {
            StatusCode::CONFLICT
          }
          // The external collaborator failed.
          Ingest::TimeoutExceeded(_) | Ingest::PredictionFailed(_) => {
            StatusCode::BAD_GATEWAY
          }
          Ingest::Io(_) | Ingest::Csv(_) | Ingest::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
          }
        };
        (status, e.to_string())
      }
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
