//! Port for JSON request/response exchanges with REST collaborators.

use async_trait::async_trait;
use serde_json::Value;

use super::define_port_error;

define_port_error! {
    /// Errors raised by JSON transports.
    pub enum TransportError {
        /// The request never produced a response.
        Transport { message: String } =>
            ServiceUnavailable: "request failed: {message}",
        /// The request exceeded its deadline.
        Timeout { message: String } =>
            ServiceUnavailable: "request timed out: {message}",
        /// The collaborator answered with a non-success status.
        Status { status: u16, message: String } =>
            ServiceUnavailable: "collaborator returned status {status}: {message}",
        /// The body was not the expected JSON.
        Decode { message: String } =>
            ServiceUnavailable: "response body could not be decoded: {message}",
    }
}

impl TransportError {
    /// Whether the collaborator reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// HTTP verbs used by the REST adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// Read.
    Get,
    /// Create.
    Post,
    /// Replace.
    Put,
    /// Partial update.
    Patch,
    /// Remove.
    Delete,
}

/// One JSON request relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRequest {
    /// Verb.
    pub method: HttpMethod,
    /// Path below the base URL, without a leading slash.
    pub path: String,
    /// Query parameters in order.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl JsonRequest {
    fn new(method: HttpMethod, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body,
        }
    }

    /// `GET path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path, None)
    }

    /// `POST path` with `body`.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, path, Some(body))
    }

    /// `PUT path` with `body`.
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Put, path, Some(body))
    }

    /// `PATCH path` with `body`.
    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Patch, path, Some(body))
    }

    /// `DELETE path`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path, None)
    }

    /// Append one query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append several query parameters.
    pub fn with_queries<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(key, value)| (key.into(), value.into())));
        self
    }

    /// First query value for `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Sends JSON requests and returns decoded JSON bodies.
///
/// An empty success body decodes as `null`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JsonTransport: Send + Sync {
    /// Perform `request`.
    async fn send(&self, request: JsonRequest) -> Result<Value, TransportError>;
}
