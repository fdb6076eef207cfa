use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /api/generate-image`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageBody {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl GenerateImageBody {
    /// Reads the known fields from any JSON value. A field that is absent or
    /// not a string is treated as missing, so the credential check can run
    /// before anything complains about the prompt or image.
    pub fn from_json(value: &Value) -> Self {
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
        Self {
            prompt: field("prompt"),
            image_data: field("imageData"),
            api_key: field("apiKey"),
            model: field("model"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageResponse {
    pub image_url: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: Value,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Value::String(details.into()),
        }
    }
}

/// Provider key info, passed through as the provider sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountInfo {
    pub raw: Value,
}

impl AccountInfo {
    fn data(&self) -> &Value {
        self.raw.get("data").unwrap_or(&self.raw)
    }

    pub fn label(&self) -> Option<&str> {
        self.data().get("label").and_then(Value::as_str)
    }

    pub fn usage(&self) -> Option<f64> {
        self.data().get("usage").and_then(Value::as_f64)
    }

    /// `None` when the key has no spending limit.
    pub fn limit(&self) -> Option<f64> {
        self.data().get("limit").and_then(Value::as_f64)
    }

    pub fn is_free_tier(&self) -> bool {
        self.data()
            .get("is_free_tier")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn remaining(&self) -> Option<f64> {
        Some(self.limit()? - self.usage().unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_account_info_reads_nested_data() {
        let info = AccountInfo {
            raw: json!({"data": {"label": "main", "usage": 1.5, "limit": 10.0, "is_free_tier": true}}),
        };
        assert_eq!(info.label(), Some("main"));
        assert_eq!(info.remaining(), Some(8.5));
        assert!(info.is_free_tier());
    }

    #[test]
    fn test_account_info_without_limit() {
        let info = AccountInfo {
            raw: json!({"data": {"usage": 3, "limit": null}}),
        };
        assert_eq!(info.limit(), None);
        assert_eq!(info.remaining(), None);
        assert!(!info.is_free_tier());
    }

    #[test]
    fn test_generate_body_uses_camel_case() {
        let body: GenerateImageBody = serde_json::from_value(json!({
            "prompt": "a cat",
            "imageData": "AAAA",
            "apiKey": "sk-1"
        }))
        .unwrap();
        assert_eq!(body.image_data.as_deref(), Some("AAAA"));
        assert_eq!(body.api_key.as_deref(), Some("sk-1"));
        assert!(body.model.is_none());
    }

    #[test]
    fn test_generate_body_from_json_ignores_wrong_types() {
        let body = GenerateImageBody::from_json(&json!({
            "prompt": 42,
            "apiKey": "sk-1",
            "imageData": null,
            "model": ["flux"]
        }));
        assert!(body.prompt.is_none());
        assert!(body.image_data.is_none());
        assert!(body.model.is_none());
        assert_eq!(body.api_key.as_deref(), Some("sk-1"));

        let body = GenerateImageBody::from_json(&json!(["not", "an", "object"]));
        assert!(body.api_key.is_none() && body.prompt.is_none());
    }
}
