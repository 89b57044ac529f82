//! Wire message types
//!
//! - [`rest`]: REST request bodies and response payloads
//! - [`stream`]: WebSocket events
//! - [`decimal`]: serde helpers for numeric fields sent as numbers or strings

pub mod decimal;
pub mod rest;
pub mod stream;
