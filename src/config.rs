use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::ModelId;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_APP_URL: &str = "http://localhost:3000";
pub const DEFAULT_APP_TITLE: &str = "S-Image";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// Sent as `HTTP-Referer`.
    pub app_url: String,
    /// Sent as `X-Title`.
    pub app_title: String,
    /// Output cap on each generation call. Not a retry budget.
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            app_title: DEFAULT_APP_TITLE.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl UpstreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let base_url = env::var("OPENROUTER_BASE_URL").unwrap_or(defaults.base_url);
        let app_url = env::var("NEXT_PUBLIC_APP_URL")
            .or_else(|_| env::var("APP_URL"))
            .unwrap_or(defaults.app_url);
        let app_title = env::var("APP_TITLE").unwrap_or(defaults.app_title);
        let max_tokens = env::var("MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_tokens);
        let timeout_secs = env::var("UPSTREAM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        UpstreamConfig {
            base_url,
            app_url,
            app_title,
            max_tokens,
            timeout_secs,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_app_identity(mut self, url: impl Into<String>, title: impl Into<String>) -> Self {
        self.app_url = url.into();
        self.app_title = title.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: Option<u16>,
    pub default_model: ModelId,
    pub max_body_bytes: usize,
    pub preferences_path: Option<PathBuf>,
    pub upstream: UpstreamConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: None,
            default_model: ModelId::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            preferences_path: None,
            upstream: UpstreamConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = env::var("HOST").unwrap_or(defaults.host);
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());
        let default_model = env::var("DEFAULT_MODEL")
            .ok()
            .and_then(|id| ModelId::parse(&id))
            .unwrap_or(defaults.default_model);
        let max_body_bytes = env::var("MAX_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_body_bytes);
        let preferences_path = env::var("PREFERENCES_PATH").ok().map(PathBuf::from);

        Config {
            host,
            port,
            default_model,
            max_body_bytes,
            preferences_path,
            upstream: UpstreamConfig::from_env(),
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_default_model(mut self, model: ModelId) -> Self {
        self.default_model = model;
        self
    }

    pub fn with_preferences_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferences_path = Some(path.into());
        self
    }

    pub fn with_upstream(mut self, config: UpstreamConfig) -> Self {
        self.upstream = config;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.port(), 3000);
        assert_eq!(config.default_model, ModelId::GeminiFlashImage);
        assert_eq!(config.upstream.max_tokens, 1000);
        assert_eq!(config.upstream.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let upstream = UpstreamConfig::new().with_base_url("http://localhost:9999/api/v1/");
        assert_eq!(
            upstream.endpoint("/chat/completions"),
            "http://localhost:9999/api/v1/chat/completions"
        );
    }

    #[test]
    fn test_builders() {
        let config = Config::new()
            .with_port(8080)
            .with_default_model(ModelId::FluxPro)
            .with_upstream(UpstreamConfig::new().with_app_identity("https://app", "Demo"));
        assert_eq!(config.port(), 8080);
        assert_eq!(config.upstream.app_title, "Demo");
        assert_eq!(config.default_model, ModelId::FluxPro);
    }

    #[test]
    fn test_upstream_limits_and_preferences_path() {
        let config = Config::new()
            .with_preferences_path("/tmp/s-image/prefs.json")
            .with_upstream(UpstreamConfig::new().with_max_tokens(256).with_timeout_secs(5));
        assert_eq!(config.upstream.max_tokens, 256);
        assert_eq!(config.upstream.timeout(), Duration::from_secs(5));
        assert_eq!(
            config.preferences_path.as_deref(),
            Some(std::path::Path::new("/tmp/s-image/prefs.json"))
        );
    }
}
