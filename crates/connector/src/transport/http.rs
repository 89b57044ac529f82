use apiengine_ports::{
    RestMethod, RestRequest, RestResponse, RestTransport, TransportError, TransportResult,
};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method};
use std::time::Duration;

use crate::error::{ConnectorError, Result};

/// `reqwest`-backed REST transport
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// `timeout` bounds each HTTP exchange; callers still apply their own
    /// deadline on top.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectorError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for a request, query string included
    pub fn url_for(&self, request: &RestRequest) -> String {
        let mut url = format!("{}/{}", self.base_url, request.path.trim_start_matches('/'));
        let query = request.query_string();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }
}

fn method(method: RestMethod) -> Method {
    match method {
        RestMethod::Get => Method::GET,
        RestMethod::Post => Method::POST,
        RestMethod::Put => Method::PUT,
        RestMethod::Delete => Method::DELETE,
    }
}

/// Split reqwest failures into "never sent" and "may have been sent"
fn classify(e: reqwest::Error) -> TransportError {
    if e.is_connect() || e.is_builder() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

#[async_trait]
impl RestTransport for HttpTransport {
    async fn execute(&self, request: RestRequest) -> TransportResult<RestResponse> {
        let url = self.url_for(&request);
        debug!("{} {}", request.method.as_str(), url);

        let has_content_type = request.header("Content-Type").is_some();
        let mut builder = self.client.request(method(request.method), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            if !has_content_type {
                builder = builder.header("Content-Type", "application/json");
            }
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        debug!("{} {} -> {}", request.method.as_str(), url, status);
        Ok(RestResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let transport =
            HttpTransport::new("https://apiengine.demoapps.space/", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.base_url(), "https://apiengine.demoapps.space");

        let request = RestRequest::get("ticker/price").with_query("symbol", "BTCUSDT");
        assert_eq!(
            transport.url_for(&request),
            "https://apiengine.demoapps.space/ticker/price?symbol=BTCUSDT"
        );
        assert_eq!(
            transport.url_for(&RestRequest::get("ping")),
            "https://apiengine.demoapps.space/ping"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_connect_failure() {
        // Nothing listens on port 1; the request never reaches anyone
        let transport = HttpTransport::new("http://127.0.0.1:1/", Duration::from_secs(2)).unwrap();
        let err = transport.execute(RestRequest::get("ping")).await.unwrap_err();
        assert!(!err.reached_exchange(), "{err:?}");
    }
}
