//! ApiEngine Connector
//!
//! Rate-safe, authenticated access to the ApiEngine spot exchange.
//!
//! ## Architecture
//!
//! ```text
//!                      ExchangeClient
//!   ┌────────────┬──────────┼───────────┬──────────────┐
//!   ▼            ▼          ▼           ▼              ▼
//! SymbolTable RateLimiter AuthInjector RestTransport OrderTracker
//! (pair ⇄     (throttler) (bearer /    (reqwest)     (normalized
//!  symbol)                 HMAC)                      states)
//! ```
//!
//! The client resolves symbols before reserving budget, so a call for an
//! unknown pair never consumes quota. Raw exchange statuses are mapped to
//! [`OrderState`](apiengine_core::OrderState) by [`normalizer`] and nothing
//! downstream sees the raw strings.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let client = ExchangeClient::connect(
//!     ConnectorConfig::default(),
//!     ApiCredentials::new(api_key, api_secret),
//! )?;
//!
//! client.fetch_exchange_info(client.default_deadline()).await?;
//! let order = client
//!     .place_order(
//!         OrderRequest::limit("BTC-USDT", Side::Buy, dec!(0.01), dec!(30000)),
//!         Deadline::within(Duration::from_secs(2)),
//!     )
//!     .await?;
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod constants;
pub mod endpoints;
pub mod error;
pub mod messages;
pub mod normalizer;
pub mod symbols;
pub mod tracker;
pub mod transport;
pub mod utils;

pub use auth::{ApiCredentials, ApiEngineAuth, AuthInjector, SigningScheme};
pub use client::{Deadline, ExchangeClient, OrderRequest};
pub use config::ConnectorConfig;
pub use endpoints::Endpoint;
pub use error::{ConnectorError, Result};
pub use messages::stream::StreamEvent;
pub use symbols::{MissingStatusPolicy, SymbolEntry, SymbolMap, SymbolTable};
pub use tracker::{OrderStatusReport, OrderTracker};
pub use transport::HttpTransport;
