use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

pub const MIME_PNG: &str = "image/png";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_GIF: &str = "image/gif";
pub const MIME_WEBP: &str = "image/webp";

/// A reference image as sent by the client: base64 payload plus its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub mime_type: String,
    pub data: String,
}

impl ImageBlob {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// The single normalized image reference produced by a successful generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalImageResult {
    pub image_url: String,
}

impl CanonicalImageResult {
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
        }
    }

    pub fn is_data_uri(&self) -> bool {
        self.image_url.starts_with("data:")
    }

    /// Decodes a base64 data URI into its MIME type and raw bytes.
    pub fn decode_data_uri(&self) -> Option<(String, Vec<u8>)> {
        let rest = self.image_url.strip_prefix("data:")?;
        let (mime, payload) = rest.split_once(";base64,")?;
        let bytes = STANDARD.decode(payload.trim()).ok()?;
        Some((mime.to_string(), bytes))
    }
}
