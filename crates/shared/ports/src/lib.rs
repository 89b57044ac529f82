//! ApiEngine Ports
//!
//! Port definitions (traits) for the connector.
//! These define the boundaries between the request-budgeting/normalization
//! core and the infrastructure it runs on (wall clock, HTTP transport).

mod clock;
mod error;
mod transport;

pub use clock::Clock;
pub use error::{TransportError, TransportResult};
pub use transport::{RestMethod, RestRequest, RestResponse, RestTransport, WsRequest};
