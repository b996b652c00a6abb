//! Router-level tests against an in-memory store and a canned predictor.

use std::{fs, sync::Arc, time::Duration};

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tensio_core::{record::NewPrediction, store::PredictionStore};
use tensio_ingest::{CannedPredictor, IngestPaths, IngestPipeline};
use tensio_store_sqlite::SqliteStore;
use tower::util::ServiceExt as _;

use crate::{AppState, api_router};

const OUTPUT_CSV: &str = "region_final,year,percentage,latitude,longitude\n\
                          Alpha,2024,12.5,-6.2,106.8\n\
                          Beta,2024,9.1,,\n";

struct TestApp {
  app:   Router,
  store: SqliteStore,
  // Keeps the temp data directory alive for the test's duration.
  _dir:  TempDir,
}

async fn test_app(predictor: CannedPredictor) -> TestApp {
  let dir = TempDir::new().unwrap();
  let geo = dir.path().join("reference.geojson");
  fs::write(&geo, r#"{"type":"FeatureCollection","features":[]}"#).unwrap();

  let mut paths = IngestPaths::under(dir.path(), geo);
  paths.timeout = Duration::from_secs(5);

  let store = SqliteStore::open_in_memory().await.unwrap();
  let state = AppState::new(
    Arc::new(store.clone()),
    Arc::new(IngestPipeline::new(paths, predictor)),
  );

  TestApp { app: api_router(state), store, _dir: dir }
}

async fn body_json(response: axum::response::Response) -> Value {
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

fn get(path: &str) -> Request<Body> {
  Request::get(path).body(Body::empty()).unwrap()
}

fn post_json(path: &str, body: Value) -> Request<Body> {
  Request::post(path)
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(body.to_string()))
    .unwrap()
}

// ─── Grid CRUD ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_list_and_get() {
  let t = test_app(CannedPredictor::silent()).await;

  let created = t
    .app
    .clone()
    .oneshot(post_json(
      "/predictions",
      json!({
        "region": "Alpha", "year": 2024,
        "area_label": null, "percentage": 12.5, "priority": "Priority",
        "latitude": -6.2, "longitude": 106.8,
        "predicted_route": null, "focus_month": null, "focus_date": null,
        "metadata": null
      }),
    ))
    .await
    .unwrap();
  assert_eq!(created.status(), StatusCode::CREATED);
  let created = body_json(created).await;
  let id = created["id"].as_i64().unwrap();

  let listed = t.app.clone().oneshot(get("/predictions")).await.unwrap();
  assert_eq!(listed.status(), StatusCode::OK);
  let listed = body_json(listed).await;
  assert_eq!(listed.as_array().unwrap().len(), 1);

  let one = t
    .app
    .clone()
    .oneshot(get(&format!("/predictions/{id}")))
    .await
    .unwrap();
  assert_eq!(one.status(), StatusCode::OK);
  assert_eq!(body_json(one).await["region"], "Alpha");
}

#[tokio::test]
async fn get_missing_prediction_is_404() {
  let t = test_app(CannedPredictor::silent()).await;
  let response = t.app.clone().oneshot(get("/predictions/42")).await.unwrap();
  assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_with_empty_region_is_400() {
  let t = test_app(CannedPredictor::silent()).await;
  let response = t
    .app
    .clone()
    .oneshot(post_json(
      "/predictions",
      json!({
        "region": "  ", "year": 2024,
        "area_label": null, "percentage": null, "priority": null,
        "latitude": null, "longitude": null,
        "predicted_route": null, "focus_month": null, "focus_date": null,
        "metadata": null
      }),
    ))
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ─── Map endpoints ───────────────────────────────────────────────────────────

#[tokio::test]
async fn geojson_serves_only_mappable_rows() {
  let t = test_app(CannedPredictor::silent()).await;

  let mut mappable = NewPrediction::new("Alpha", 2024);
  mappable.latitude = Some(-6.2);
  mappable.longitude = Some(106.8);
  t.store.upsert(mappable).await.unwrap();
  t.store.upsert(NewPrediction::new("Beta", 2024)).await.unwrap();

  let response = t
    .app
    .clone()
    .oneshot(get("/map/predictions"))
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::OK);

  let collection = body_json(response).await;
  assert_eq!(collection["type"], "FeatureCollection");
  assert_eq!(collection["features"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn reference_geojson_is_served_verbatim() {
  let t = test_app(CannedPredictor::silent()).await;

  let response = t.app.clone().oneshot(get("/map/geojson")).await.unwrap();
  assert_eq!(response.status(), StatusCode::OK);
  let body = body_json(response).await;
  assert_eq!(body["type"], "FeatureCollection");
}

#[tokio::test]
async fn filters_lists_years_and_routes() {
  let t = test_app(CannedPredictor::silent()).await;

  let mut row = NewPrediction::new("Alpha", 2024);
  row.predicted_route = Some("Route A".into());
  t.store.upsert(row).await.unwrap();

  let response = t.app.clone().oneshot(get("/filters")).await.unwrap();
  let filters = body_json(response).await;
  assert_eq!(filters["years"], json!([2024]));
  assert_eq!(filters["routes"], json!(["Route A"]));
}

// ─── Ingestion triggers ──────────────────────────────────────────────────────

#[tokio::test]
async fn upload_runs_the_full_pipeline() {
  let t = test_app(CannedPredictor::succeeding(OUTPUT_CSV)).await;

  let boundary = "tensio-test-boundary";
  let body = format!(
    "--{boundary}\r\n\
     Content-Disposition: form-data; name=\"dataset\"; filename=\"upload.csv\"\r\n\
     Content-Type: text/csv\r\n\r\n\
     region,year\nAlpha,2024\nBeta,2024\n\r\n\
     --{boundary}--\r\n"
  );
  let request = Request::post("/ingest/upload")
    .header(
      header::CONTENT_TYPE,
      format!("multipart/form-data; boundary={boundary}"),
    )
    .body(Body::from(body))
    .unwrap();

  let response = t.app.clone().oneshot(request).await.unwrap();
  assert_eq!(response.status(), StatusCode::OK);

  let report = body_json(response).await;
  assert_eq!(report["batch_year"], 2024);
  assert_eq!(report["upserted"], 2);

  assert!(t.store.find("Alpha", 2024).await.unwrap().is_some());
}

#[tokio::test]
async fn upload_without_dataset_field_is_400() {
  let t = test_app(CannedPredictor::silent()).await;

  let boundary = "tensio-test-boundary";
  let body = format!("--{boundary}--\r\n");
  let request = Request::post("/ingest/upload")
    .header(
      header::CONTENT_TYPE,
      format!("multipart/form-data; boundary={boundary}"),
    )
    .body(Body::from(body))
    .unwrap();

  let response = t.app.clone().oneshot(request).await.unwrap();
  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn run_without_canonical_dataset_reports_client_error() {
  let t = test_app(CannedPredictor::succeeding(OUTPUT_CSV)).await;

  let request = Request::post("/ingest/run").body(Body::empty()).unwrap();
  let response = t.app.clone().oneshot(request).await.unwrap();
  assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn run_reports_bad_gateway_when_predictor_fails() {
  let t = test_app(CannedPredictor::failing("model exploded")).await;

  // Install a canonical dataset by hand so the run reaches the predictor.
  let paths_dir = t._dir.path().join("ml_input");
  fs::create_dir_all(&paths_dir).unwrap();
  fs::write(paths_dir.join("dataset.csv"), "region,year\nAlpha,2024\n").unwrap();

  let request = Request::post("/ingest/run").body(Body::empty()).unwrap();
  let response = t.app.clone().oneshot(request).await.unwrap();
  assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
