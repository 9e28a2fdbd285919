//! Outbound request description.
//!
//! # Responsibilities
//! - Carry everything needed to issue one call: function suffix, query
//!   parameters, headers, body and the response callback
//! - Generate a unique request ID for log correlation
//!
//! # Design Decisions
//! - Requests are moved into the connector and handled exactly once
//! - Header names are validated at send time, not at build time

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::http::query::QueryValue;
use crate::http::response::Response;

/// Unique identifier attached to every request for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// HTTP method used for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Get method as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback invoked exactly once with the finished request and its outcome.
pub type ResponseCallback = Box<dyn FnOnce(&Request, Response) + Send + 'static>;

/// A single call to be queued on a connector.
pub struct Request {
    id: RequestId,
    function: String,
    parameters: Vec<(String, QueryValue)>,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    method: Option<HttpMethod>,
    on_response: Option<ResponseCallback>,
}

impl Request {
    /// Create an empty GET request against the connector's base URL.
    pub fn new() -> Self {
        Self {
            id: RequestId::new(),
            function: String::new(),
            parameters: Vec::new(),
            headers: Vec::new(),
            body: None,
            method: None,
            on_response: None,
        }
    }

    /// Append a suffix to the connector's base URL.
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }

    /// Add a query parameter. Order of insertion is preserved.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }

    /// Set a header, replacing any previous value with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name.into(), value.into());
        self
    }

    /// Attach a raw body. Requests with a body default to POST.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body and set `Content-Type`.
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> serde_json::Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(self
            .with_header("Content-Type", "application/json")
            .with_body(body))
    }

    /// Override the method derived from the presence of a body.
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Register the response callback.
    pub fn on_response<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&Request, Response) + Send + 'static,
    {
        self.on_response = Some(Box::new(callback));
        self
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn parameters(&self) -> &[(String, QueryValue)] {
        &self.parameters
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Effective method: the override if set, else GET without a body and
    /// POST with one.
    pub fn method(&self) -> HttpMethod {
        match (self.method, &self.body) {
            (Some(m), _) => m,
            (None, Some(_)) => HttpMethod::Post,
            (None, None) => HttpMethod::Get,
        }
    }

    pub(crate) fn take_callback(&mut self) -> Option<ResponseCallback> {
        self.on_response.take()
    }

    pub(crate) fn set_callback(&mut self, callback: ResponseCallback) {
        self.on_response = Some(callback);
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("function", &self.function)
            .field("parameters", &self.parameters.len())
            .field("headers", &self.headers.len())
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .field("method", &self.method())
            .field("has_callback", &self.on_response.is_some())
            .finish()
    }
}

/// Insert or replace a header. Names compare ASCII case-insensitively.
pub fn set_header(headers: &mut Vec<(String, String)>, name: String, value: String) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
        Some(entry) => *entry = (name, value),
        None => headers.push((name, value)),
    }
}
