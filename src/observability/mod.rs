//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Registry and connectors produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log output (stdout)
//!     → Whatever metrics recorder the host installs
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line of a transfer
//! - Metrics are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
