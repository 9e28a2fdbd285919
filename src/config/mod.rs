//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ConnectorConfig (validated, immutable)
//!     → handed to ConnectorRegistry
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → ConnectorRegistry::reload swaps config and flushes cached connectors
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::ConnectionConfig;
pub use schema::ConnectorConfig;
pub use schema::CredentialConfig;
pub use schema::GatewayConfig;
pub use schema::GatewayEndpoint;
pub use schema::ObservabilityConfig;
