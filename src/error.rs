use serde_json::Value;
use thiserror::Error;

use crate::models::ErrorBody;

pub const CREDITS_URL: &str = "https://openrouter.ai/settings/credits";

#[derive(Debug, Error)]
pub enum ImageGenError {
    /// Bad input caught before any network call.
    #[error("Validation error: {error} {details}")]
    Validation { error: String, details: String },

    #[error("Auth error: {error} {details}")]
    Auth { error: String, details: String },

    /// The upstream message that triggered the classification is kept for logs.
    #[error("Insufficient credits: {0}")]
    InsufficientCredits(String),

    #[error("Upstream error ({status}): {message}")]
    Upstream {
        status: u16,
        message: String,
        details: Value,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider answered but no image could be extracted. Carries the
    /// model's text reply when there was one.
    #[error("No image in response")]
    NotFound { text_reply: Option<String> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ImageGenError {
    pub fn validation(error: impl Into<String>, details: impl Into<String>) -> Self {
        ImageGenError::Validation {
            error: error.into(),
            details: details.into(),
        }
    }

    pub fn auth(error: impl Into<String>, details: impl Into<String>) -> Self {
        ImageGenError::Auth {
            error: error.into(),
            details: details.into(),
        }
    }

    pub fn missing_api_key() -> Self {
        Self::auth(
            "API Key is missing.",
            "Please provide your OpenRouter API Key in the settings.",
        )
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ImageGenError::Validation { .. } => 400,
            ImageGenError::Auth { .. } => 401,
            ImageGenError::InsufficientCredits(_) => 402,
            ImageGenError::Upstream { status, .. } => *status,
            ImageGenError::Transport(_)
            | ImageGenError::NotFound { .. }
            | ImageGenError::Config(_)
            | ImageGenError::Storage(_)
            | ImageGenError::Serialization(_) => 500,
        }
    }

    /// The `{error, details}` pair shown to the caller.
    pub fn to_body(&self) -> ErrorBody {
        match self {
            ImageGenError::Validation { error, details } | ImageGenError::Auth { error, details } => {
                ErrorBody::new(error.clone(), details.clone())
            }
            ImageGenError::InsufficientCredits(_) => ErrorBody::new(
                "Insufficient credits.",
                format!(
                    "Your OpenRouter account has run out of credits. Please visit {} to add more credits.",
                    CREDITS_URL
                ),
            ),
            ImageGenError::Upstream {
                message, details, ..
            } => ErrorBody {
                error: message.clone(),
                details: details.clone(),
            },
            ImageGenError::Transport(msg) => {
                ErrorBody::new("Could not reach the image provider.", msg.clone())
            }
            ImageGenError::NotFound { text_reply } => {
                let mut details =
                    "The model didn't return any image content. Try a different prompt."
                        .to_string();
                if let Some(reply) = text_reply {
                    details.push_str(&format!(" The model replied: {}", reply));
                }
                ErrorBody::new("No valid response from the API.", details)
            }
            ImageGenError::Config(msg)
            | ImageGenError::Storage(msg)
            | ImageGenError::Serialization(msg) => {
                ErrorBody::new("Internal Server Error", msg.clone())
            }
        }
    }
}

impl From<serde_json::Error> for ImageGenError {
    fn from(e: serde_json::Error) -> Self {
        ImageGenError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ImageGenError>;
