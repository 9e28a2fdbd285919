//! Queued REST connectors with bounded transfers and callback delivery.

pub mod config;
pub mod connector;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ConnectorConfig;
pub use connector::{Connector, ConnectorError, ConnectorRegistry};
pub use http::{Request, Response};
pub use lifecycle::Shutdown;
