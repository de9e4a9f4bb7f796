//! Query execution against a broker

use serde_json::Value;
use tracing::{debug, warn};

use super::config::ClientConfig;
use super::error::ExecutionError;
use super::transport::{HttpTransport, RawResponse, Transport};
use crate::context::{processors, ContextScope, QueryContext};
use crate::query::Query;

const TIMEOUT_ERROR: &str = "Query timeout";

/// Dimension and metric names a broker reports for a data source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSourceSchema {
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
}

/// Validates and sends queries, one attempt per call
#[derive(Debug)]
pub struct Client<T = HttpTransport> {
    config: ClientConfig,
    transport: T,
    schema: Option<DataSourceSchema>,
}

impl Client<HttpTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, HttpTransport::new())
    }

    /// Build a client, fetching the schema if the config asks for it
    pub async fn connect(config: ClientConfig) -> Result<Self, ExecutionError> {
        let mut client = Self::new(config);
        if client.config.fetch_schema {
            client.refresh_schema().await?;
        }
        Ok(client)
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            schema: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Schema from the last `refresh_schema`
    pub fn schema(&self) -> Option<&DataSourceSchema> {
        self.schema.as_ref()
    }

    /// Ask the broker for the configured data source's schema
    ///
    /// Brokers answer 200 even for unknown data sources; anything but an
    /// object gives an empty schema.
    pub async fn fetch_schema(&self) -> Result<DataSourceSchema, ExecutionError> {
        let url = self
            .config
            .data_source_metadata_endpoint()
            .ok_or(ExecutionError::MissingDataSource)?;
        let response = self.transport.get(&url).await?;
        let body = decode(&response, &Value::Null)?;

        let names = |key: &str| -> Vec<String> {
            body.get(key)
                .and_then(Value::as_array)
                .map(|names| names.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default()
        };
        Ok(DataSourceSchema {
            dimensions: names("dimensions"),
            metrics: names("metrics"),
        })
    }

    pub async fn refresh_schema(&mut self) -> Result<&DataSourceSchema, ExecutionError> {
        let schema = self.fetch_schema().await?;
        Ok(&*self.schema.insert(schema))
    }

    /// Apply the client's own processors and those active in `context`,
    /// then validate
    ///
    /// The client's timeout and data source are entered into `context`
    /// for the duration of the call.
    pub fn prepare(&self, context: &QueryContext, query: Query) -> Result<Query, ExecutionError> {
        let mut scopes: Vec<ContextScope<'_>> = Vec::new();
        if self.config.timeout_ms > 0 {
            scopes.push(context.enter_processor(processors::timeout(self.config.timeout_ms))?);
        }
        if let Some(data_source) = &self.config.data_source {
            scopes.push(context.enter_processor(processors::data_source(data_source.as_str()))?);
        }

        let query = context.process(query)?;
        // Validated while the scopes are active, so processors can
        // still supply the data source
        query.validate()?;
        drop(scopes);
        Ok(query)
    }

    /// Send an already prepared query
    pub async fn issue_request(&self, query: &Query) -> Result<Value, ExecutionError> {
        let body = serde_json::to_string(query).map_err(|e| ExecutionError::Transport {
            message: format!("could not encode query: {e}"),
        })?;
        debug!(query_type = query.query_type(), url = %self.config.endpoint(), "issuing query");

        let response = self.transport.post(&self.config.endpoint(), body).await?;
        let sent = query.to_value();
        let parsed = decode(&response, &sent)?;
        if response.status == 200 {
            return Ok(parsed);
        }

        if parsed.get("error").and_then(Value::as_str) == Some(TIMEOUT_ERROR) {
            warn!(
                elapsed_ms = response.elapsed.as_millis() as u64,
                timeout_ms = ?query.timeout(),
                "query timed out"
            );
            return Err(ExecutionError::Timeout {
                elapsed: response.elapsed,
                timeout_ms: query.timeout(),
                query: sent,
                response: parsed,
            });
        }
        warn!(status = response.status, "query failed");
        Err(ExecutionError::Status {
            status: response.status,
            query: sent,
            response: parsed,
        })
    }

    /// Prepare under `context` and send
    pub async fn execute_in(&self, context: &QueryContext, query: Query) -> Result<Value, ExecutionError> {
        let query = self.prepare(context, query)?;
        self.issue_request(&query).await
    }

    pub async fn execute(&self, query: Query) -> Result<Value, ExecutionError> {
        self.execute_in(&QueryContext::new(), query).await
    }
}

fn decode(response: &RawResponse, query: &Value) -> Result<Value, ExecutionError> {
    serde_json::from_str(&response.body).map_err(|_| ExecutionError::InvalidJson {
        query: query.clone(),
        response: response.body.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::Aggregation;
    use crate::time::{Interval, SimpleGranularity};
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl Transport for Unreachable {
        async fn post(&self, _: &str, _: String) -> Result<RawResponse, ExecutionError> {
            Err(ExecutionError::Transport { message: "offline".into() })
        }

        async fn get(&self, _: &str) -> Result<RawResponse, ExecutionError> {
            Err(ExecutionError::Transport { message: "offline".into() })
        }
    }

    fn query() -> Query {
        Query::timeseries(
            vec![Aggregation::count("rows")],
            SimpleGranularity::All,
            Interval::parse("2017-01-01/2017-01-02").unwrap(),
        )
    }

    #[test]
    fn test_prepare_applies_config() {
        let config = ClientConfig::new("localhost", 8082)
            .with_timeout(1000)
            .with_data_source("wikipedia");
        let client = Client::with_transport(config, Unreachable);
        let context = QueryContext::new();

        let prepared = client.prepare(&context, query()).unwrap();
        assert_eq!(prepared.timeout(), Some(1000));
        assert_eq!(prepared.data_source(), Some(&serde_json::json!("wikipedia")));
        assert!(context.is_empty());
    }

    #[test]
    fn test_prepare_requires_data_source() {
        let client = Client::with_transport(ClientConfig::new("localhost", 8082), Unreachable);
        let err = client.prepare(&QueryContext::new(), query()).unwrap_err();
        assert!(matches!(err, ExecutionError::Validation(_)));
    }

    #[test]
    fn test_prepare_conflicting_context() {
        let client = Client::with_transport(ClientConfig::new("h", 1).with_timeout(5), Unreachable);
        let context = QueryContext::new();
        let _outer = context.enter_processor(processors::timeout(10)).unwrap();
        let err = client.prepare(&context, query()).unwrap_err();
        assert!(matches!(err, ExecutionError::Context(_)));
        assert_eq!(context.keys(), vec!["timeout"]);
    }
}
