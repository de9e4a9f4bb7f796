//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use druidkit::client::{ExecutionError, RawResponse, Transport};
use druidkit::{parser, ClientConfig, DataSourceView};
use parking_lot::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

static INIT: Once = Once::new();

/// Install a test subscriber once per test binary; `RUST_LOG` overrides
/// the default level
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = Registry::default()
            .with(filter)
            .with(fmt::layer().with_target(true).with_test_writer());
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Load a data-source view from the tests/test_data directory
pub fn load_fixture(name: &str) -> DataSourceView {
    let path = format!("tests/test_data/{}", name);
    parser::parse_view_file(&path)
        .unwrap_or_else(|e| panic!("Failed to load test data {}: {}", name, e))
}

/// Load client configuration from the tests/test_data directory
pub fn load_config(name: &str) -> ClientConfig {
    let path = format!("tests/test_data/{}", name);
    parser::parse_client_config_file(&path)
        .unwrap_or_else(|e| panic!("Failed to load test data {}: {}", name, e))
}

// =============================================================================
// Transport Stub
// =============================================================================

/// A request seen by the stub
#[derive(Debug, Clone, PartialEq)]
pub struct SeenRequest {
    pub method: &'static str,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

/// Answers requests from a queue of canned responses, recording each one
#[derive(Default)]
pub struct StubTransport {
    responses: Mutex<VecDeque<RawResponse>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with the given status and body
    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.responses.lock().push_back(RawResponse {
            status,
            body: body.into(),
            elapsed: Duration::from_millis(25),
        });
        self
    }

    pub fn respond_json(self, status: u16, body: serde_json::Value) -> Self {
        self.respond(status, body.to_string())
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().clone()
    }

    fn next(&self, request: SeenRequest) -> Result<RawResponse, ExecutionError> {
        self.seen.lock().push(request);
        self.responses.lock().pop_front().ok_or_else(|| ExecutionError::Transport {
            message: "no canned response left".to_string(),
        })
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn post(&self, url: &str, body: String) -> Result<RawResponse, ExecutionError> {
        self.next(SeenRequest {
            method: "POST",
            url: url.to_string(),
            body: serde_json::from_str(&body).ok(),
        })
    }

    async fn get(&self, url: &str) -> Result<RawResponse, ExecutionError> {
        self.next(SeenRequest {
            method: "GET",
            url: url.to_string(),
            body: None,
        })
    }
}
