//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` overrides the configured log level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Build the filter: `RUST_LOG` if set, else the configured level for this crate.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("rest_connector={}", config.log_level).into())
}

/// Install the global subscriber. Safe to call more than once; later calls are ignored.
pub fn init_logging(config: &ObservabilityConfig) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
