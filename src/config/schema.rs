//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the connector
//! registry. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the connector registry.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Transfer timeouts and the connection bound.
    pub connection: ConnectionConfig,

    /// Gateway routing settings.
    pub gateway: GatewayConfig,

    /// Per-service credential records.
    pub credentials: Vec<CredentialConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ConnectorConfig {
    /// Find the credential record for a service (exact match).
    pub fn find_credentials(&self, service_id: &str) -> Option<&CredentialConfig> {
        self.credentials.iter().find(|c| c.service_id == service_id)
    }

    /// Find the gateway endpoint registered for `(service_id, function)`.
    ///
    /// Always `None` while gateway routing is disabled.
    pub fn find_gateway_endpoint(
        &self,
        service_id: &str,
        function: &str,
    ) -> Option<&GatewayEndpoint> {
        if !self.gateway.enabled {
            return None;
        }
        self.gateway
            .endpoints
            .iter()
            .find(|e| e.service_id == service_id && e.function == function)
    }
}

/// Transfer settings shared by every connector.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Time to wait for a single transfer, in seconds.
    pub request_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Maximum simultaneous in-flight transfers.
    pub max_concurrent: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            connect_secs: 5,
            max_concurrent: 5,
        }
    }
}

/// Gateway routing configuration.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Route registered endpoints through the gateway.
    pub enabled: bool,

    /// Gateway URL used as the base URL of routed connectors.
    pub url: String,

    /// Application key sent as `app-key`.
    pub app_key: String,

    /// Secret key sent as `secret-key`.
    pub secret_key: String,

    /// Endpoints eligible for gateway routing.
    pub endpoints: Vec<GatewayEndpoint>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("enabled", &self.enabled)
            .field("url", &self.url)
            .field("app_key", &self.app_key)
            .field("secret_key", &"***")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

/// A `(service, function)` pair routed through the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayEndpoint {
    /// Service identifier.
    pub service_id: String,

    /// Function suffix, matched exactly.
    pub function: String,

    /// Value of the `service-type` header.
    pub service_type: String,
}

/// Stored credentials for one service.
#[derive(Clone, Deserialize, Serialize)]
pub struct CredentialConfig {
    /// Service identifier used for lookup.
    pub service_id: String,

    /// Service root URL.
    pub url: String,

    /// Basic auth user.
    #[serde(default)]
    pub username: String,

    /// Basic auth password.
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("service_id", &self.service_id)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Record connector metrics.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}
