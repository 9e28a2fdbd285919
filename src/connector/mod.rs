//! Connector subsystem.
//!
//! # Data Flow
//! ```text
//! get_connector(service, function)
//!     → registry.rs (cache hit, or resolve gateway route / credentials)
//!     → pipeline.rs (Connector: FIFO queue + drain task)
//!
//! Connector::send(request)
//!     → queue tail
//!     → drain task: build URL + headers → acquire transfer slot
//!     → transport with timeout → Response → request callback
//! ```
//!
//! # Design Decisions
//! - Each connector is a serial pipeline; `max_concurrent` bounds transfers
//!   across all connectors of a registry
//! - Synchronous errors only for bad arguments and missing credentials
//! - Per-request failures travel through `Response`, never as `Err`

pub mod error;
pub mod key;
pub mod pipeline;
pub mod registry;

pub use error::{ConnectorError, ConnectorResult};
pub use key::ConnectorKey;
pub use pipeline::{BasicAuth, Connector, ConnectorSettings};
pub use registry::ConnectorRegistry;
