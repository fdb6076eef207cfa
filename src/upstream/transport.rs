use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};
use serde_json::Value;
use std::time::Duration;

use crate::error::{ImageGenError, Result};

/// Status and raw body of one upstream round trip.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `None` when the body is empty or not JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// The HTTP seam of the upstream client. Implementations make exactly one
/// attempt per call; errors here mean the provider was never reached or the
/// body could not be read.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
    ) -> Result<TransportResponse>;

    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<TransportResponse>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImageGenError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn build_headers(headers: &[(String, String)]) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ImageGenError::validation("Invalid request header.", format!("{}: {}", name, e))
            })?;
            // Never echo the value: it may be the credential.
            let value = HeaderValue::from_str(value).map_err(|_| {
                ImageGenError::validation(
                    "Invalid request header.",
                    format!("The value for {} contains characters that cannot be sent.", name),
                )
            })?;
            map.insert(name, value);
        }
        Ok(map)
    }

    async fn finish(response: reqwest::Response) -> Result<TransportResponse> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            ImageGenError::Transport(format!("Failed to read upstream response: {}", e))
        })?;
        Ok(TransportResponse { status, body })
    }
}

fn transport_error(e: reqwest::Error) -> ImageGenError {
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    // The URL is left out of the message.
    ImageGenError::Transport(format!("Upstream {}: {}", kind, e.without_url()))
}

#[async_trait]
impl UpstreamTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
    ) -> Result<TransportResponse> {
        let response = self
            .client
            .post(url)
            .headers(Self::build_headers(headers)?)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        Self::finish(response).await
    }

    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<TransportResponse> {
        let response = self
            .client
            .get(url)
            .headers(Self::build_headers(headers)?)
            .send()
            .await
            .map_err(transport_error)?;
        Self::finish(response).await
    }
}
