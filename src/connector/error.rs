//! Connector error definitions.

use thiserror::Error;

/// Errors raised synchronously by the registry and connectors.
///
/// Per-request failures (network errors, timeouts, error statuses) are never
/// returned here; they reach the caller through `Response::success == false`.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Empty identifier or malformed request passed to an entry point.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No stored credentials and no gateway route for the service.
    #[error("Credentials not found for service '{0}'")]
    CredentialsNotFound(String),

    /// HTTP client could not be constructed.
    #[error("Transport setup failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The drain task ended without delivering a response.
    #[error("Response dropped before delivery for request {0}")]
    ResponseDropped(String),
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
