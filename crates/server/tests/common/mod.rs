//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock collaborators injected, so pipelines run without any external
//! tools.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use invoicer_core::{
    config::{Config, DatabaseConfig, ServerConfig},
    testing::MockCollaborators,
    PipelineController, PipelineKind,
};

/// Test fixture for E2E testing with mock dependencies.
///
/// Both pipelines share one [`MockCollaborators`], so tests can hold, fail or
/// inspect any collaborator call.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_trigger() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/procesar_facturas").await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock collaborators - control every pipeline call
    pub mock: Arc<MockCollaborators>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    /// Raw body, for non-JSON responses
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with both pipelines enabled.
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    /// Create a test fixture with custom configuration.
    pub fn with_config(test_config: TestConfig) -> Self {
        let mock = Arc::new(MockCollaborators::new());

        let mut config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: ":memory:".into(),
            },
            ..Default::default()
        };
        config.pipelines.invoice.enabled = test_config.enable_invoice;
        config.pipelines.training.enabled = test_config.enable_training;
        config.pipelines.invoice.stage_timeout_secs = test_config.stage_timeout_secs;
        config.pipelines.training.stage_timeout_secs = test_config.stage_timeout_secs;

        let controller = |kind: PipelineKind, enabled: bool| {
            enabled.then(|| {
                Arc::new(PipelineController::from_config(
                    kind,
                    &config.pipelines,
                    mock.collaborators(),
                ))
            })
        };
        let invoice = controller(PipelineKind::Invoice, test_config.enable_invoice);
        let training = controller(PipelineKind::Training, test_config.enable_training);

        let state = Arc::new(invoicer_server::state::AppState::new(
            config, invoice, training,
        ));

        // Create router
        let router = invoicer_server::api::create_router(state);

        Self { router, mock }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    /// Send a POST request without a body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path).await
    }

    /// Poll `{path}` until `estado` is one of `states`.
    pub async fn wait_for_estado(&self, path: &str, states: &[&str]) -> TestResponse {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let response = self.get(path).await;
            let estado = response.body["estado"].as_str().unwrap_or_default();
            if states.contains(&estado) || tokio::time::Instant::now() >= deadline {
                return response;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub enable_invoice: bool,
    pub enable_training: bool,
    /// Per-call timeout for both pipelines (0 = unbounded)
    pub stage_timeout_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            enable_invoice: true,
            enable_training: true,
            stage_timeout_secs: 0,
        }
    }
}

impl TestConfig {
    /// Only the invoice pipeline is served.
    pub fn invoice_only() -> Self {
        Self {
            enable_training: false,
            ..Default::default()
        }
    }
}

/// Helper to assert response status with better error messages.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
