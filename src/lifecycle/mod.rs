//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → stop reload loop → wait for connectors to go idle → exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
