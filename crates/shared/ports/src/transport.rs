//! REST/WebSocket transport port
//!
//! The connector never touches sockets itself. It builds [`RestRequest`]s,
//! hands them to a [`RestTransport`] and reads back a [`RestResponse`].

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::TransportResult;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl RestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// Outbound REST request, relative to the transport's base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestRequest {
    pub method: RestMethod,
    /// Path without leading slash, e.g. `order/abc-123`
    pub path: String,
    /// Query parameters, in the order they are sent
    pub query: Vec<(String, String)>,
    /// JSON body text
    pub body: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl RestRequest {
    pub fn new(method: RestMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(RestMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(RestMethod::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(RestMethod::Delete, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Query string as sent on the wire (`a=1&b=2`), empty if no parameters
    pub fn query_string(&self) -> String {
        self.query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Raw REST response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestResponse {
    pub status: u16,
    pub body: String,
}

impl RestResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Request used to open or talk on the streaming channel
#[derive(Debug, Clone, PartialEq)]
pub struct WsRequest {
    pub payload: serde_json::Value,
    pub headers: BTreeMap<String, String>,
}

impl WsRequest {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload,
            headers: BTreeMap::new(),
        }
    }
}

/// Issues REST requests against the exchange
///
/// Implementations own connection pooling, TLS and the base URL. They must
/// report failures that happened before anything was written to the wire as
/// [`TransportError::Connect`](crate::TransportError::Connect).
#[async_trait]
pub trait RestTransport: Send + Sync {
    async fn execute(&self, request: RestRequest) -> TransportResult<RestResponse>;
}
