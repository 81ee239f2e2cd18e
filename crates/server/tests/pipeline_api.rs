//! End-to-end tests of the pipeline HTTP surface with mocked collaborators.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestConfig, TestFixture};

const INVOICE: &str = "/procesar_facturas";
const INVOICE_STATUS: &str = "/procesar_facturas/status";
const INVOICE_RESET: &str = "/procesar_facturas/reset";
const TRAINING: &str = "/train_model";
const TRAINING_STATUS: &str = "/train_model/status";

// =============================================================================
// Service Endpoints
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new();
    let response = fixture.get("/health").await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "status", json!("ok"));
}

#[tokio::test]
async fn test_root_lists_enabled_endpoints() {
    let fixture = TestFixture::new();
    let response = fixture.get("/").await;

    assert_status!(response, StatusCode::OK);
    assert!(response.body["mensaje"].is_string());
    assert_json_path!(response.body, "version", json!(env!("CARGO_PKG_VERSION")));

    let endpoints = response.body["endpoints"].as_object().unwrap();
    assert!(endpoints.contains_key("POST /procesar_facturas"));
    assert!(endpoints.contains_key("GET /procesar_facturas/status"));
    assert!(endpoints.contains_key("POST /procesar_facturas/reset"));
    assert!(endpoints.contains_key("POST /train_model"));
}

#[tokio::test]
async fn test_config_endpoint_returns_sanitized() {
    let fixture = TestFixture::new();
    let response = fixture.get("/config").await;

    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body["pipelines"]["invoice"], "enabled", json!(true));
    assert_json_path!(
        response.body["pipelines"]["invoice"],
        "period_folder",
        json!("mes en curso")
    );
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new();
    fixture.get("/health").await;

    let response = fixture.get("/metrics").await;
    assert_status!(response, StatusCode::OK);
    assert!(response.text.contains("invoicer_http_requests_total"));
    assert!(response.text.contains("invoicer_pipeline_status"));
}

// =============================================================================
// Pipeline Lifecycle
// =============================================================================

#[tokio::test]
async fn test_initial_status_is_idle() {
    let fixture = TestFixture::new();
    let response = fixture.get(INVOICE_STATUS).await;

    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "estado", json!("inactivo"));
    assert_json_path!(response.body, "etapa_actual", json!(null));
    assert_json_path!(response.body, "progreso", json!(0));
    assert_json_path!(response.body, "mensaje", json!(null));
    assert_json_path!(response.body, "inicio", json!(null));
    assert_json_path!(response.body, "fin", json!(null));
    assert_json_path!(response.body, "error", json!(null));
}

#[tokio::test]
async fn test_trigger_runs_invoice_pipeline() {
    let fixture = TestFixture::new();

    let response = fixture.post(INVOICE).await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "estado", json!("en_cola"));
    assert!(response.body["mensaje"].is_string());

    let status = fixture
        .wait_for_estado(INVOICE_STATUS, &["completado", "error"])
        .await;
    assert_json_path!(status.body, "estado", json!("completado"));
    assert_json_path!(status.body, "progreso", json!(100));
    assert_json_path!(status.body, "etapa_actual", json!("finalizado"));
    assert_json_path!(status.body, "error", json!(null));
    assert!(status.body["inicio"].is_string());
    assert!(status.body["fin"].is_string());

    assert_eq!(fixture.mock.call_count("purge_remote").await, 1);
}

#[tokio::test]
async fn test_second_trigger_conflicts_while_running() {
    let fixture = TestFixture::new();
    fixture.mock.hold("predict").await;

    assert_status!(fixture.post(INVOICE).await, StatusCode::OK);
    assert!(fixture.mock.wait_for_call("predict", Duration::from_secs(5)).await);

    let response = fixture.post(INVOICE).await;
    assert_status!(response, StatusCode::CONFLICT);
    assert!(response.body["error"].is_string());

    let status = fixture.get(INVOICE_STATUS).await;
    assert_json_path!(status.body, "estado", json!("ejecutando"));
    assert_json_path!(status.body, "etapa_actual", json!("prediccion"));
    assert_json_path!(status.body, "progreso", json!(30));

    fixture.mock.release("predict").await;
    let status = fixture
        .wait_for_estado(INVOICE_STATUS, &["completado", "error"])
        .await;
    assert_json_path!(status.body, "estado", json!("completado"));
}

#[tokio::test]
async fn test_reset_conflicts_while_running() {
    let fixture = TestFixture::new();
    fixture.mock.hold("fetch").await;

    fixture.post(INVOICE).await;
    assert!(fixture.mock.wait_for_call("fetch", Duration::from_secs(5)).await);

    let response = fixture.post(INVOICE_RESET).await;
    assert_status!(response, StatusCode::CONFLICT);
    assert!(response.body["error"].is_string());

    fixture.mock.release("fetch").await;
    fixture
        .wait_for_estado(INVOICE_STATUS, &["completado", "error"])
        .await;

    let response = fixture.post(INVOICE_RESET).await;
    assert_status!(response, StatusCode::OK);
    assert!(response.body["mensaje"].is_string());

    let status = fixture.get(INVOICE_STATUS).await;
    assert_json_path!(status.body, "estado", json!("inactivo"));
    assert_json_path!(status.body, "progreso", json!(0));
}

#[tokio::test]
async fn test_failed_run_reports_error() {
    let fixture = TestFixture::new();
    fixture.mock.fail_on("recognize", "OCR service unavailable").await;

    fixture.post(INVOICE).await;
    let status = fixture
        .wait_for_estado(INVOICE_STATUS, &["completado", "error"])
        .await;

    assert_json_path!(status.body, "estado", json!("error"));
    assert_json_path!(status.body, "etapa_actual", json!("procesamiento_ocr"));
    assert_json_path!(status.body, "progreso", json!(65));
    let error = status.body["error"].as_str().unwrap();
    assert!(error.contains("OCR service unavailable"));
    assert!(status.body["fin"].is_string());

    // A failed run does not block a new trigger.
    let response = fixture.post(INVOICE).await;
    assert_status!(response, StatusCode::OK);
}

#[tokio::test]
async fn test_pipelines_are_isolated() {
    let fixture = TestFixture::new();
    fixture.mock.hold("predict").await;

    fixture.post(INVOICE).await;
    assert!(fixture.mock.wait_for_call("predict", Duration::from_secs(5)).await);

    // Training is unaffected by the running invoice pipeline.
    let response = fixture.post(TRAINING).await;
    assert_status!(response, StatusCode::OK);
    let status = fixture
        .wait_for_estado(TRAINING_STATUS, &["completado", "error"])
        .await;
    assert_json_path!(status.body, "estado", json!("completado"));

    let invoice = fixture.get(INVOICE_STATUS).await;
    assert_json_path!(invoice.body, "estado", json!("ejecutando"));

    fixture.mock.release("predict").await;
}

#[tokio::test]
async fn test_disabled_pipeline_has_no_routes() {
    let fixture = TestFixture::with_config(TestConfig::invoice_only());

    assert_status!(fixture.post(TRAINING).await, StatusCode::NOT_FOUND);
    assert_status!(fixture.get(TRAINING_STATUS).await, StatusCode::NOT_FOUND);
    assert_status!(fixture.get(INVOICE_STATUS).await, StatusCode::OK);

    let root = fixture.get("/").await;
    let endpoints = root.body["endpoints"].as_object().unwrap();
    assert!(!endpoints.contains_key("POST /train_model"));
}

#[tokio::test]
async fn test_status_requires_get() {
    let fixture = TestFixture::new();
    let response = fixture.post(INVOICE_STATUS).await;
    assert_status!(response, StatusCode::METHOD_NOT_ALLOWED);
}
