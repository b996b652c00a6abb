//! Ingestion trigger endpoints.
//!
//! Both handlers hold the state's ingest lock for the whole pipeline run,
//! so simultaneous triggers queue instead of racing the canonical dataset
//! file and the archive rename.

use std::path::Path;

use axum::{
  Json,
  extract::{Multipart, State},
};
use tensio_core::store::PredictionStore;
use tensio_ingest::{IngestReport, Predictor, convert::DatasetKind};

use crate::{AppState, error::ApiError};

/// `POST /ingest/run` — run prediction + reconciliation against the
/// already-installed canonical dataset.
pub async fn run<S, P>(
  State(state): State<AppState<S, P>>,
) -> Result<Json<IngestReport>, ApiError>
where
  S: PredictionStore,
  P: Predictor,
{
  let _guard = state.ingest_lock.lock().await;
  let report = state.pipeline.run(state.store.as_ref()).await?;
  Ok(Json(report))
}

/// `POST /ingest/upload` — multipart upload of a new dataset (field
/// `dataset`), then the full pipeline.
pub async fn upload<S, P>(
  State(state): State<AppState<S, P>>,
  mut multipart: Multipart,
) -> Result<Json<IngestReport>, ApiError>
where
  S: PredictionStore,
  P: Predictor,
{
  let mut saved: Option<(std::path::PathBuf, DatasetKind)> = None;

  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
  {
    if field.name() != Some("dataset") {
      continue;
    }

    let file_name = sanitize_file_name(field.file_name());
    let kind = DatasetKind::from_path(Path::new(&file_name));
    let bytes = field
      .bytes()
      .await
      .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;

    let upload_dir = state
      .pipeline
      .paths()
      .canonical_dataset
      .parent()
      .map(|p| p.join("uploads"))
      .ok_or_else(|| ApiError::BadRequest("invalid dataset location".into()))?;
    tokio::fs::create_dir_all(&upload_dir)
      .await
      .map_err(tensio_ingest::Error::from)?;

    let dest = upload_dir.join(&file_name);
    tokio::fs::write(&dest, &bytes)
      .await
      .map_err(tensio_ingest::Error::from)?;

    tracing::info!(upload = %dest.display(), "dataset uploaded");
    saved = Some((dest, kind));
  }

  let Some((uploaded, kind)) = saved else {
    return Err(ApiError::BadRequest(
      "multipart field `dataset` is required".into(),
    ));
  };

  let _guard = state.ingest_lock.lock().await;
  let report = state
    .pipeline
    .ingest(&uploaded, kind, state.store.as_ref())
    .await?;
  Ok(Json(report))
}

/// Keep only the final path component of a client-supplied filename.
fn sanitize_file_name(name: Option<&str>) -> String {
  name
    .and_then(|n| Path::new(n).file_name())
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| "dataset.csv".to_string())
}

#[cfg(test)]
mod tests {
  use super::sanitize_file_name;

  #[test]
  fn sanitize_strips_directories() {
    assert_eq!(sanitize_file_name(Some("../../etc/passwd")), "passwd");
    assert_eq!(sanitize_file_name(Some("data.xlsx")), "data.xlsx");
    assert_eq!(sanitize_file_name(None), "dataset.csv");
  }
}
