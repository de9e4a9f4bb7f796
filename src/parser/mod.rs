//! YAML parser (verb module)
//!
//! Transforms YAML files into data-source views and client
//! configuration. Records inside a view are validated as they load.

use std::path::Path;

use crate::client::ClientConfig;
use crate::datasource::DataSourceView;
use crate::error::ParseError;

fn read<P: AsRef<Path>>(path: P) -> Result<String, ParseError> {
    let path_str = path.as_ref().display().to_string();
    std::fs::read_to_string(&path).map_err(|e| ParseError::Io {
        path: path_str,
        source: e,
    })
}

/// Parse a data-source view from a YAML file
pub fn parse_view_file<P: AsRef<Path>>(path: P) -> Result<DataSourceView, ParseError> {
    parse_view_str(&read(path)?)
}

/// Parse a data-source view from a YAML string
pub fn parse_view_str(yaml: &str) -> Result<DataSourceView, ParseError> {
    serde_yaml::from_str(yaml).map_err(ParseError::from)
}

/// Parse client configuration from a YAML file
pub fn parse_client_config_file<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ParseError> {
    parse_client_config_str(&read(path)?)
}

/// Parse client configuration from a YAML string
pub fn parse_client_config_str(yaml: &str) -> Result<ClientConfig, ParseError> {
    serde_yaml::from_str(yaml).map_err(ParseError::from)
}
