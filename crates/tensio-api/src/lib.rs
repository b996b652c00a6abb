//! JSON REST API for Tensio.
//!
//! Exposes an axum [`Router`] backed by any
//! [`tensio_core::store::PredictionStore`] and any
//! [`tensio_ingest::Predictor`]. Auth, TLS, and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tensio_api::api_router(state))
//! ```

pub mod error;
pub mod ingest;
pub mod map;
pub mod predictions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use tensio_core::store::PredictionStore;
use tensio_ingest::{IngestPipeline, Predictor};

pub use error::ApiError;

#[cfg(test)]
mod tests;

/// Shared state threaded through all axum handlers.
pub struct AppState<S, P: Predictor> {
  pub store:    Arc<S>,
  pub pipeline: Arc<IngestPipeline<P>>,
  /// Serializes ingestion triggers — two operators uploading at once would
  /// otherwise race the canonical dataset file.
  pub ingest_lock: Arc<tokio::sync::Mutex<()>>,
}

impl<S, P: Predictor> AppState<S, P> {
  pub fn new(store: Arc<S>, pipeline: Arc<IngestPipeline<P>>) -> Self {
    Self {
      store,
      pipeline,
      ingest_lock: Arc::new(tokio::sync::Mutex::new(())),
    }
  }
}

impl<S, P: Predictor> Clone for AppState<S, P> {
  fn clone(&self) -> Self {
    Self {
      store:       self.store.clone(),
      pipeline:    self.pipeline.clone(),
      ingest_lock: self.ingest_lock.clone(),
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, P>(state: AppState<S, P>) -> Router<()>
where
  S: PredictionStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  P: Predictor + 'static,
{
  Router::new()
    // Admin grid
    .route(
      "/predictions",
      get(predictions::list::<S, P>).post(predictions::create::<S, P>),
    )
    .route(
      "/predictions/{id}",
      get(predictions::get_one::<S, P>).put(predictions::update::<S, P>),
    )
    // Map
    .route("/map/predictions", get(map::predictions_geojson::<S, P>))
    .route("/map/geojson", get(map::reference_geojson::<S, P>))
    .route("/filters", get(map::filters::<S, P>))
    // Ingestion triggers
    .route("/ingest/run", post(ingest::run::<S, P>))
    .route("/ingest/upload", post(ingest::upload::<S, P>))
    .with_state(state)
}
