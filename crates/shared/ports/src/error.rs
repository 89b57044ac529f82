use thiserror::Error;

/// Failures raised by a [`RestTransport`](crate::RestTransport)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never left the process (DNS, connect, TLS, request build)
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The request was sent but no usable response came back
    #[error("Request failed: {0}")]
    Request(String),

    /// The response arrived but its body could not be read
    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl TransportError {
    /// Whether the request may have reached the exchange. Rate-limit usage
    /// stays charged for anything that did.
    pub fn reached_exchange(&self) -> bool {
        !matches!(self, TransportError::Connect(_))
    }
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;
