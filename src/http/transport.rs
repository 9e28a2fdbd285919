//! HTTP transport abstraction.
//!
//! # Responsibilities
//! - Perform one HTTP exchange for a fully built transfer
//! - Report low-level failures as `TransferError`
//!
//! # Design Decisions
//! - The connector owns timeout handling; transports only need to finish or fail
//! - Non-2xx statuses are returned as responses, the connector classifies them
//! - Trait object so tests can inject mock transports

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::http::request::HttpMethod;

/// A fully resolved transfer ready to be issued.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// Raw reply from the remote endpoint.
#[derive(Debug, Clone)]
pub struct TransferReply {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Errors that can occur while performing a transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Connection or protocol failure.
    #[error("{0}")]
    Network(String),

    /// No reply within the configured timeout.
    #[error("Timeout")]
    Timeout,

    /// Server answered with a non-success status.
    #[error("HTTP {0}")]
    Status(u16),
}

/// Performs HTTP exchanges on behalf of connectors.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn execute(&self, transfer: Transfer) -> Result<TransferReply, TransferError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build the client with the given connect timeout.
    pub fn new(connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, transfer: Transfer) -> Result<TransferReply, TransferError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &transfer.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransferError::Network(format!("invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransferError::Network(format!("invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let builder = match transfer.method {
            HttpMethod::Get => self.client.get(&transfer.url),
            HttpMethod::Post => self.client.post(&transfer.url),
            HttpMethod::Put => self.client.put(&transfer.url),
            HttpMethod::Patch => self.client.patch(&transfer.url),
            HttpMethod::Delete => self.client.delete(&transfer.url),
        };

        let mut builder = builder.headers(headers);
        if let Some(body) = transfer.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransferError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransferError::Network(e.to_string()))?;

        Ok(TransferReply {
            status,
            body: body.to_vec(),
        })
    }
}
