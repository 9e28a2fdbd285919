//! Connector registry.
//!
//! # Responsibilities
//! - Single point of lookup/creation for connectors keyed by (service, function)
//! - Resolve base URL and credentials from configuration
//! - Route gateway-eligible endpoints through the gateway
//! - Share one pool of transfer slots between all connectors
//!
//! # Design Decisions
//! - Cache is a `DashMap`; creation happens under the entry lock, so
//!   concurrent first lookups of a key yield one connector
//! - Configuration lives in an `ArcSwap` so reloads never block lookups
//! - Flushing drops cache entries only; handed-out connectors keep draining
//!   and are tracked weakly so `wait_idle` still covers them

use arc_swap::ArcSwap;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::ConnectorConfig;
use crate::connector::error::{ConnectorError, ConnectorResult};
use crate::connector::key::ConnectorKey;
use crate::connector::pipeline::{BasicAuth, Connector, ConnectorSettings};
use crate::http::transport::{HttpTransport, Transport};
use crate::observability::metrics;

/// Header carrying the gateway's service routing key.
pub const SERVICE_TYPE_HEADER: &str = "service-type";
/// Header carrying the gateway application key.
pub const APP_KEY_HEADER: &str = "app-key";
/// Header carrying the gateway secret key.
pub const SECRET_KEY_HEADER: &str = "secret-key";

/// Lazily creates and caches connectors.
pub struct ConnectorRegistry {
    config: ArcSwap<ConnectorConfig>,
    slots: ArcSwap<Semaphore>,
    cache: DashMap<ConnectorKey, Arc<Connector>>,
    /// Flushed connectors that may still be draining.
    retired: Mutex<Vec<Weak<Connector>>>,
    transport: Arc<dyn Transport>,
}

impl ConnectorRegistry {
    /// Create a registry using the given transport.
    pub fn new(config: ConnectorConfig, transport: Arc<dyn Transport>) -> Self {
        let slots = Arc::new(transfer_slots(&config));
        Self {
            config: ArcSwap::from_pointee(config),
            slots: ArcSwap::from(slots),
            cache: DashMap::new(),
            retired: Mutex::new(Vec::new()),
            transport,
        }
    }

    /// Create a registry backed by a `reqwest` transport.
    pub fn from_config(config: ConnectorConfig) -> ConnectorResult<Self> {
        let transport = HttpTransport::new(Duration::from_secs(config.connection.connect_secs))?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// Get or create the connector for `(service_id, function)`.
    pub fn get_connector(&self, service_id: &str, function: &str) -> ConnectorResult<Arc<Connector>> {
        if service_id.is_empty() {
            return Err(ConnectorError::InvalidArgument("service_id is empty".into()));
        }
        if function.is_empty() {
            return Err(ConnectorError::InvalidArgument("function is empty".into()));
        }

        let key = ConnectorKey::new(service_id, function);
        match self.cache.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let connector = Arc::new(self.build_connector(entry.key().clone())?);
                tracing::debug!(
                    connector = %entry.key(),
                    base_url = %connector.base_url(),
                    using_gateway = connector.using_gateway(),
                    "Connector created"
                );
                entry.insert(connector.clone());
                Ok(connector)
            }
        }
    }

    /// Drop every cached connector.
    ///
    /// Flushed connectors finish their queues; `wait_idle` keeps waiting on
    /// them for as long as they are alive.
    pub fn flush_connectors(&self) {
        let mut retired = self.retired.lock().unwrap_or_else(PoisonError::into_inner);
        retired.retain(|weak| weak.strong_count() > 0);
        let mut count = 0;
        self.cache.retain(|_, connector| {
            retired.push(Arc::downgrade(connector));
            count += 1;
            false
        });
        tracing::info!(count, "Flushed connectors");
    }

    /// Swap in new configuration and flush so later lookups pick it up.
    ///
    /// Only connectors created after the reload use the new transfer slots.
    /// Flushed connectors keep draining on the old pool, so until they are
    /// idle up to twice `max_concurrent` transfers can be in flight.
    pub fn reload(&self, config: ConnectorConfig) {
        self.slots.store(Arc::new(transfer_slots(&config)));
        self.config.store(Arc::new(config));
        self.flush_connectors();
        tracing::info!("Connector configuration reloaded");
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<ConnectorConfig> {
        self.config.load_full()
    }

    /// Number of cached connectors.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Wait until every cached or flushed connector has drained its queue.
    pub async fn wait_idle(&self) {
        let mut connectors: Vec<Arc<Connector>> =
            self.cache.iter().map(|r| r.value().clone()).collect();
        {
            let mut retired = self.retired.lock().unwrap_or_else(PoisonError::into_inner);
            retired.retain(|weak| weak.strong_count() > 0);
            connectors.extend(retired.iter().filter_map(Weak::upgrade));
        }
        for connector in connectors {
            connector.wait_idle().await;
        }
    }

    fn build_connector(&self, key: ConnectorKey) -> ConnectorResult<Connector> {
        let config = self.config.load();
        let base = ConnectorSettings::new(String::new())
            .with_timeout(Duration::from_secs(config.connection.request_secs))
            .with_max_concurrent(config.connection.max_concurrent);

        let settings = if let Some(endpoint) =
            config.find_gateway_endpoint(key.service_id(), key.function())
        {
            ConnectorSettings {
                base_url: config.gateway.url.clone(),
                ..base
            }
            .with_gateway(true)
            .with_header(SERVICE_TYPE_HEADER, endpoint.service_type.clone())
            .with_header(APP_KEY_HEADER, config.gateway.app_key.clone())
            .with_header(SECRET_KEY_HEADER, config.gateway.secret_key.clone())
        } else {
            let Some(creds) = config.find_credentials(key.service_id()) else {
                tracing::warn!(service = %key.service_id(), "Credentials not found");
                metrics::record_credentials_missing(key.service_id());
                return Err(ConnectorError::CredentialsNotFound(key.service_id().to_string()));
            };
            ConnectorSettings {
                base_url: format!("{}{}", creds.url, key.function()),
                ..base
            }
            .with_auth(BasicAuth::new(creds.username.clone(), creds.password.clone()))
        };

        Ok(Connector::with_slots(
            key,
            settings,
            self.transport.clone(),
            self.slots.load_full(),
        ))
    }
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("connectors", &self.cache.len())
            .field("transport", &self.transport)
            .finish()
    }
}

fn transfer_slots(config: &ConnectorConfig) -> Semaphore {
    Semaphore::new(config.connection.max_concurrent.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CredentialConfig, GatewayEndpoint};
    use crate::http::transport::{Transfer, TransferError, TransferReply};
    use crate::http::Request;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct RecordingTransport {
        seen: Mutex<Vec<Transfer>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn execute(&self, transfer: Transfer) -> Result<TransferReply, TransferError> {
            self.seen.lock().unwrap().push(transfer);
            Ok(TransferReply {
                status: 200,
                body: b"{}".to_vec(),
            })
        }
    }

    #[derive(Debug)]
    struct SlowTransport(Duration);

    #[async_trait]
    impl Transport for SlowTransport {
        async fn execute(&self, _transfer: Transfer) -> Result<TransferReply, TransferError> {
            tokio::time::sleep(self.0).await;
            Ok(TransferReply {
                status: 200,
                body: Vec::new(),
            })
        }
    }

    fn config() -> ConnectorConfig {
        let mut config = ConnectorConfig::default();
        config.connection.request_secs = 7;
        config.connection.max_concurrent = 2;
        config.credentials.push(CredentialConfig {
            service_id: "svcA".into(),
            url: "https://svc-a.example.com/api".into(),
            username: "user".into(),
            password: "pass".into(),
        });
        config
    }

    fn registry(config: ConnectorConfig) -> (ConnectorRegistry, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        (ConnectorRegistry::new(config, transport.clone()), transport)
    }

    #[test]
    fn test_repeated_lookup_returns_same_instance() {
        let (registry, _) = registry(config());
        let a = registry.get_connector("svcA", "/x").unwrap();
        let b = registry.get_connector("svcA", "/x").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);

        let c = registry.get_connector("svcA", "/y").unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_direct_connector_settings() {
        let (registry, _) = registry(config());
        let conn = registry.get_connector("svcA", "/x").unwrap();
        assert_eq!(conn.base_url(), "https://svc-a.example.com/api/x");
        assert!(!conn.using_gateway());
        assert_eq!(conn.max_concurrent(), 2);
        assert_eq!(conn.settings().timeout, Duration::from_secs(7));
        assert_eq!(conn.settings().auth, Some(BasicAuth::new("user", "pass")));
    }

    #[tokio::test]
    async fn test_flush_gives_fresh_instance() {
        let (registry, _) = registry(config());
        let before = registry.get_connector("svcA", "/x").unwrap();
        before.call(Request::new()).await.unwrap();

        registry.flush_connectors();
        assert!(registry.is_empty());

        let after = registry.get_connector("svcA", "/x").unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.pending_count(), 0);
        assert_eq!(after.active_count(), 0);

        // Flushed handles keep working.
        let response = before.call(Request::new()).await.unwrap();
        assert!(response.success);
    }

    #[test]
    fn test_missing_credentials() {
        let (registry, _) = registry(config());
        let result = registry.get_connector("unknown-service", "/f");
        assert!(matches!(result, Err(ConnectorError::CredentialsNotFound(s)) if s == "unknown-service"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_empty_arguments_rejected() {
        let (registry, _) = registry(config());
        assert!(matches!(
            registry.get_connector("", "/f"),
            Err(ConnectorError::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.get_connector("svcA", ""),
            Err(ConnectorError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_gateway_routing() {
        let mut config = config();
        config.gateway.enabled = true;
        config.gateway.url = "https://gw.example.com/route".into();
        config.gateway.app_key = "app".into();
        config.gateway.secret_key = "secret".into();
        config.gateway.endpoints.push(GatewayEndpoint {
            service_id: "assistant".into(),
            function: "/v1/message".into(),
            service_type: "assistant".into(),
        });
        let (registry, transport) = registry(config);

        // Gateway endpoints need no stored credentials.
        let conn = registry.get_connector("assistant", "/v1/message").unwrap();
        assert!(conn.using_gateway());
        assert_eq!(conn.base_url(), "https://gw.example.com/route");
        assert!(conn.settings().auth.is_none());

        conn.call(Request::new()).await.unwrap();
        let seen = transport.seen.lock().unwrap().clone();
        let headers = &seen[0].headers;
        assert!(headers.contains(&(SERVICE_TYPE_HEADER.to_string(), "assistant".to_string())));
        assert!(headers.contains(&(APP_KEY_HEADER.to_string(), "app".to_string())));
        assert!(headers.contains(&(SECRET_KEY_HEADER.to_string(), "secret".to_string())));
        assert!(!headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("authorization")));

        // Other functions of the same service fall back to credentials.
        assert!(matches!(
            registry.get_connector("assistant", "/v2/other"),
            Err(ConnectorError::CredentialsNotFound(_))
        ));
    }

    #[test]
    fn test_reload_flushes_and_applies_config() {
        let (registry, _) = registry(config());
        let before = registry.get_connector("svcA", "/x").unwrap();

        let mut updated = config();
        updated.credentials[0].url = "https://svc-a-v2.example.com".into();
        updated.connection.max_concurrent = 4;
        registry.reload(updated);

        assert!(registry.is_empty());
        let after = registry.get_connector("svcA", "/x").unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.base_url(), "https://svc-a-v2.example.com/x");
        assert_eq!(after.max_concurrent(), 4);
        assert_eq!(registry.config().connection.max_concurrent, 4);
        // Flushed connectors keep their original settings.
        assert_eq!(before.max_concurrent(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_idle_covers_flushed_connectors() {
        let registry = ConnectorRegistry::new(config(), Arc::new(SlowTransport(Duration::from_millis(300))));
        let conn = registry.get_connector("svcA", "/x").unwrap();

        let delivered = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let delivered = delivered.clone();
            conn.send(Request::new().on_response(move |_, response| {
                assert!(response.success);
                delivered.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        }
        drop(conn);

        registry.reload(config());
        assert!(registry.is_empty());

        let start = tokio::time::Instant::now();
        registry.wait_idle().await;
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() >= Duration::from_millis(600));
    }

    #[test]
    fn test_concurrent_first_lookup_creates_one_connector() {
        let (registry, _) = registry(config());
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.get_connector("svcA", "/race").unwrap())
            })
            .collect();
        let connectors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(connectors.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.len(), 1);
    }
}
