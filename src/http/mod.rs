//! HTTP request/response model and transport.
//!
//! # Data Flow
//! ```text
//! Caller builds Request (function, parameters, headers, body, callback)
//!     → connector queues it
//!     → query.rs (URL + escaped query string)
//!     → transport.rs (issue the transfer)
//!     → response.rs (outcome handed to the callback)
//! ```

pub mod query;
pub mod request;
pub mod response;
pub mod transport;

pub use query::QueryValue;
pub use request::{HttpMethod, Request, RequestId, ResponseCallback};
pub use response::Response;
pub use transport::{HttpTransport, Transfer, TransferError, TransferReply, Transport};
