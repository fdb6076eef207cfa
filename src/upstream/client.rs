use serde_json::Value;
use std::sync::Arc;

use crate::{
    config::UpstreamConfig,
    encoder,
    error::{ImageGenError, Result},
    logger,
    models::{AccountInfo, Credential, ModelId, MultimodalMessage},
    upstream::{
        classify::classify_upstream_failure,
        transport::{ReqwestTransport, UpstreamTransport},
    },
};

pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
pub const KEY_INFO_PATH: &str = "/auth/key";

/// Client for the OpenRouter generation and key-info endpoints.
///
/// Every call is a single attempt. Generation requests are billed, so a
/// failed send is reported to the caller instead of being retried here.
#[derive(Clone)]
pub struct OpenRouterClient {
    transport: Arc<dyn UpstreamTransport>,
    config: UpstreamConfig,
}

impl OpenRouterClient {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.timeout())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: UpstreamConfig, transport: Arc<dyn UpstreamTransport>) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    fn build_headers(&self, credential: &Credential) -> Vec<(String, String)> {
        vec![
            ("Authorization".to_string(), credential.bearer()),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("HTTP-Referer".to_string(), self.config.app_url.clone()),
            ("X-Title".to_string(), self.config.app_title.clone()),
        ]
    }

    /// Posts one chat completion and returns the provider's raw JSON.
    pub async fn send(
        &self,
        message: MultimodalMessage,
        credential: &Credential,
        model: &ModelId,
    ) -> Result<Value> {
        let request = encoder::build_request(message, model, self.config.max_tokens);
        let payload = serde_json::to_value(&request)?;
        let url = self.config.endpoint(CHAT_COMPLETIONS_PATH);

        log::info!(
            "Sending image generation request to OpenRouter (model: {}, key: {})",
            model,
            credential.redacted()
        );

        let timer = logger::timer("openrouter chat completion");
        let response = self
            .transport
            .post_json(&url, &self.build_headers(credential), &payload)
            .await;
        drop(timer);
        let response = response?;

        if !response.is_success() {
            let error = classify_upstream_failure(response.status, &response.body);
            log::error!("OpenRouter API error ({}): {}", response.status, error);
            return Err(error);
        }

        log::info!("OpenRouter response received");
        log::debug!("OpenRouter response body: {}", response.body);

        response.json().ok_or_else(|| {
            ImageGenError::Transport("OpenRouter returned a response that is not valid JSON".into())
        })
    }

    /// Fetches key info (usage, limit, free-tier flag) and passes it through.
    pub async fn fetch_credits(&self, credential: Option<&Credential>) -> Result<AccountInfo> {
        let credential = credential.ok_or_else(|| {
            ImageGenError::auth(
                "Missing or invalid Authorization header",
                "Send your OpenRouter API key as a Bearer token.",
            )
        })?;

        let url = self.config.endpoint(KEY_INFO_PATH);
        log::debug!("Fetching key info for {}", credential.redacted());

        let response = self
            .transport
            .get(&url, &self.build_headers(credential))
            .await?;

        if !response.is_success() {
            log::warn!("Key info request failed with status {}", response.status);
            let details = response
                .json()
                .unwrap_or_else(|| Value::Object(Default::default()));
            return Err(ImageGenError::Upstream {
                status: response.status,
                message: "Failed to fetch key info".to_string(),
                details,
            });
        }

        let raw = response.json().ok_or_else(|| {
            ImageGenError::Transport("OpenRouter returned key info that is not valid JSON".into())
        })?;
        Ok(AccountInfo { raw })
    }
}
