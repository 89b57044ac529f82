use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::auth::SigningScheme;
use crate::constants::{CLIENT_ORDER_ID_PREFIX, MAX_ORDER_ID_LEN, REST_URL, WSS_URL};
use crate::error::{ConnectorError, Result};
use crate::symbols::MissingStatusPolicy;

/// Connector settings
///
/// Credentials are not part of the config; they are handed to the client
/// separately as [`ApiCredentials`](crate::auth::ApiCredentials).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub rest_url: String,
    pub wss_url: String,
    /// Per-call deadline used when the caller does not pass one
    pub request_timeout_ms: u64,
    pub missing_status_policy: MissingStatusPolicy,
    pub signing: SigningScheme,
    pub client_order_id_prefix: String,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        ConnectorConfig {
            rest_url: REST_URL.to_string(),
            wss_url: WSS_URL.to_string(),
            request_timeout_ms: 10_000,
            missing_status_policy: MissingStatusPolicy::default(),
            signing: SigningScheme::default(),
            client_order_id_prefix: CLIENT_ORDER_ID_PREFIX.to_string(),
        }
    }
}

impl ConnectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rest_url(mut self, url: impl Into<String>) -> Self {
        self.rest_url = url.into();
        self
    }

    pub fn with_wss_url(mut self, url: impl Into<String>) -> Self {
        self.wss_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_missing_status_policy(mut self, policy: MissingStatusPolicy) -> Self {
        self.missing_status_policy = policy;
        self
    }

    pub fn with_signing(mut self, signing: SigningScheme) -> Self {
        self.signing = signing;
        self
    }

    pub fn with_client_order_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.client_order_id_prefix = prefix.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Reject settings the client cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.rest_url.trim().is_empty() {
            return Err(ConnectorError::Configuration("rest_url is empty".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConnectorError::Configuration(
                "request_timeout_ms must be positive".into(),
            ));
        }
        let prefix = &self.client_order_id_prefix;
        // Leave room for the side tag and at least some randomness
        if prefix.len() + 9 > MAX_ORDER_ID_LEN
            || !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ConnectorError::Configuration(format!(
                "invalid client order id prefix {:?}",
                prefix
            )));
        }
        Ok(())
    }
}
