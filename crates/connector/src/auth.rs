//! Request authentication
//!
//! [`AuthInjector`] decorates outbound requests with credentials. The default
//! [`ApiEngineAuth`] adds the exchange's static key headers and a bearer token;
//! [`SigningScheme::HmacSha256`] additionally signs every REST request with a
//! timestamp taken from the injected clock.

use apiengine_ports::{Clock, RestRequest, WsRequest};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const API_SECRET_HEADER: &str = "x-api-secret";
pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const TIMESTAMP_HEADER: &str = "x-api-timestamp";
pub const SIGNATURE_HEADER: &str = "x-api-signature";

/// Decorates outbound requests with authentication material
///
/// Implementations are pure: no I/O, no blocking, no failure. Everything the
/// caller put on the request is preserved except headers the injector owns.
pub trait AuthInjector: Send + Sync {
    fn decorate_rest(&self, request: RestRequest) -> RestRequest;

    fn decorate_ws(&self, request: WsRequest) -> WsRequest;
}

/// How REST requests are authenticated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningScheme {
    /// Static key headers plus a bearer token
    #[default]
    BearerToken,
    /// Bearer headers plus a timestamped HMAC-SHA256 signature
    HmacSha256,
}

/// API credentials
///
/// The secret and the bearer token are wrapped in `SecretString` and never
/// printed by `Debug`.
#[derive(Clone)]
pub struct ApiCredentials {
    api_key: String,
    api_secret: SecretString,
    bearer_token: Option<SecretString>,
}

impl ApiCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: SecretString::from(api_secret.into()),
            bearer_token: None,
        }
    }

    /// Use an explicit session token instead of the API key as bearer
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(SecretString::from(token.into()));
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Only for signing and header injection. Never log the return value.
    pub fn expose_secret(&self) -> &str {
        self.api_secret.expose_secret()
    }

    fn bearer_token(&self) -> &str {
        match &self.bearer_token {
            Some(token) => token.expose_secret(),
            None => &self.api_key,
        }
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Authentication for the ApiEngine exchange
pub struct ApiEngineAuth {
    credentials: ApiCredentials,
    scheme: SigningScheme,
    clock: Arc<dyn Clock>,
}

impl ApiEngineAuth {
    pub fn new(credentials: ApiCredentials, scheme: SigningScheme, clock: Arc<dyn Clock>) -> Self {
        Self {
            credentials,
            scheme,
            clock,
        }
    }

    pub fn scheme(&self) -> SigningScheme {
        self.scheme
    }

    pub fn api_key(&self) -> &str {
        self.credentials.api_key()
    }

    /// Headers added to every authenticated REST request
    pub fn header_for_authentication(&self) -> Vec<(&'static str, String)> {
        vec![
            (API_KEY_HEADER, self.credentials.api_key().to_string()),
            (API_SECRET_HEADER, self.credentials.expose_secret().to_string()),
            (
                AUTHORIZATION_HEADER,
                format!("Bearer {}", self.credentials.bearer_token()),
            ),
        ]
    }

    /// Hex HMAC-SHA256 over `timestamp ‖ METHOD ‖ path ‖ query ‖ body`
    pub fn sign(&self, request: &RestRequest, timestamp_ms: i64) -> String {
        let payload = format!(
            "{}{}{}{}{}",
            timestamp_ms,
            request.method.as_str(),
            request.path,
            request.query_string(),
            request.body.as_deref().unwrap_or("")
        );

        let mut mac = HmacSha256::new_from_slice(self.credentials.expose_secret().as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Insert a header, replacing any existing one with the same name in any case
fn set_header(request: &mut RestRequest, name: &str, value: String) {
    request
        .headers
        .retain(|key, _| !key.eq_ignore_ascii_case(name));
    request.headers.insert(name.to_string(), value);
}

impl AuthInjector for ApiEngineAuth {
    fn decorate_rest(&self, mut request: RestRequest) -> RestRequest {
        for (name, value) in self.header_for_authentication() {
            set_header(&mut request, name, value);
        }

        if self.scheme == SigningScheme::HmacSha256 {
            let timestamp_ms = self.clock.now().timestamp_millis();
            let signature = self.sign(&request, timestamp_ms);
            set_header(&mut request, TIMESTAMP_HEADER, timestamp_ms.to_string());
            set_header(&mut request, SIGNATURE_HEADER, signature);
        }

        request
    }

    /// The stream needs no authentication
    fn decorate_ws(&self, request: WsRequest) -> WsRequest {
        request
    }
}
