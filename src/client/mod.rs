//! Broker client (verb module)
//!
//! Query → HTTP → JSON. Requests go through a `Transport` so the
//! network can be swapped out.

mod client;
mod config;
mod error;
mod transport;

pub use client::{Client, DataSourceSchema};
pub use config::ClientConfig;
pub use error::ExecutionError;
pub use transport::{HttpTransport, RawResponse, Transport};
