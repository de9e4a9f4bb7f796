//! Client configuration

use serde::{Deserialize, Serialize};

fn default_path() -> String {
    "druid/v2".to_string()
}

/// Where and how to reach a broker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_path")]
    pub path: String,
    /// Query timeout set on every executed query; 0 disables it
    #[serde(default)]
    pub timeout_ms: u64,
    /// Data source set on every executed query
    pub data_source: Option<String>,
    /// Fetch dimensions and metrics when connecting
    #[serde(default)]
    pub fetch_schema: bool,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            path: default_path(),
            timeout_ms: 0,
            data_source: None,
            fetch_schema: false,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_data_source(mut self, data_source: impl Into<String>) -> Self {
        self.data_source = Some(data_source.into());
        self
    }

    /// Query endpoint
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}/{}", self.host, self.port, self.path)
    }

    pub fn broker_metadata_endpoint(&self) -> String {
        format!("{}/datasources", self.endpoint())
    }

    /// Metadata endpoint of the configured data source
    pub fn data_source_metadata_endpoint(&self) -> Option<String> {
        self.data_source
            .as_ref()
            .map(|ds| format!("{}/{ds}", self.broker_metadata_endpoint()))
    }
}
