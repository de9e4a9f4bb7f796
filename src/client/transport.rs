//! HTTP transport

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::error::ExecutionError;

/// A response as received: status, raw body and round-trip time
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    pub elapsed: Duration,
}

/// Sends requests to a broker
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON body
    async fn post(&self, url: &str, body: String) -> Result<RawResponse, ExecutionError>;

    async fn get(&self, url: &str) -> Result<RawResponse, ExecutionError>;
}

/// `Transport` over a reqwest client
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a request timeout on top of the broker's query timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, ExecutionError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn read(response: reqwest::Response, started: Instant) -> Result<RawResponse, ExecutionError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse {
            status,
            body,
            elapsed: started.elapsed(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, body: String) -> Result<RawResponse, ExecutionError> {
        let started = Instant::now();
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        Self::read(response, started).await
    }

    async fn get(&self, url: &str) -> Result<RawResponse, ExecutionError> {
        let started = Instant::now();
        let response = self.client.get(url).send().await?;
        Self::read(response, started).await
    }
}
