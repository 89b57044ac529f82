//! Transport implementations
//!
//! The client depends only on the [`RestTransport`](apiengine_ports::RestTransport)
//! port; [`HttpTransport`] is the production implementation on `reqwest`.

pub mod http;

pub use http::HttpTransport;
