//! Builds the upstream chat message from a prompt and an optional reference image.

use crate::{
    error::{ImageGenError, Result},
    models::{
        ChatCompletionRequest, ContentPart, ImageBlob, ImageUrl, MessageContent, ModelId,
        MultimodalMessage, MIME_GIF, MIME_JPEG, MIME_PNG, MIME_WEBP,
    },
};

/// Leading base64 characters of each supported format.
const MAGIC_PREFIXES: [(&str, &str); 5] = [
    ("/9j/", MIME_JPEG),
    ("iVBORw0KGgo", MIME_PNG),
    ("R0lGODlh", MIME_GIF),
    ("R0lGODdh", MIME_GIF),
    ("UklGR", MIME_WEBP),
];

/// Whitespace is ignored. Accepts `[A-Za-z0-9+/]*` followed by at most two
/// `=` and a total length divisible by 4.
pub fn is_valid_base64(input: &str) -> bool {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let body = cleaned.trim_end_matches('=');
    let padding = cleaned.len() - body.len();

    padding <= 2
        && cleaned.len() % 4 == 0
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

/// Falls back to PNG when no known prefix matches.
pub fn sniff_mime_type(base64_data: &str) -> &'static str {
    MAGIC_PREFIXES
        .iter()
        .find(|(prefix, _)| base64_data.starts_with(prefix))
        .map(|(_, mime)| *mime)
        .unwrap_or(MIME_PNG)
}

/// Accepts either a `data:<mime>;base64,<payload>` URI or bare base64.
pub fn parse_image_data(raw: &str) -> Result<ImageBlob> {
    let (mime_type, payload) = match split_data_uri(raw) {
        Some((mime, payload)) => (mime.to_string(), payload),
        None => {
            let payload = raw.trim();
            (sniff_mime_type(payload).to_string(), payload)
        }
    };

    if !is_valid_base64(payload) {
        return Err(ImageGenError::validation(
            "Invalid image data provided.",
            "The base64 image data appears to be corrupted or invalid.",
        ));
    }

    Ok(ImageBlob {
        mime_type,
        data: payload.chars().filter(|c| !c.is_whitespace()).collect(),
    })
}

fn split_data_uri(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    if mime.is_empty() || mime.contains(';') || payload.is_empty() {
        return None;
    }
    Some((mime, payload))
}

pub fn instruction_for(prompt: &str) -> String {
    format!(
        "Based on the provided image, {}. Generate a new image that incorporates the reference image and follows these instructions.",
        prompt
    )
}

/// The image part always precedes the text part.
pub fn encode(prompt: &str, reference_image: Option<&ImageBlob>) -> MultimodalMessage {
    let content = match reference_image {
        None => MessageContent::Text(prompt.to_string()),
        Some(image) => MessageContent::Parts(vec![
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.to_data_uri(),
                },
            },
            ContentPart::Text {
                text: instruction_for(prompt),
            },
        ]),
    };

    MultimodalMessage::user(content)
}

pub fn build_request(
    message: MultimodalMessage,
    model: &ModelId,
    max_tokens: u32,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.as_str().to_string(),
        messages: vec![message],
        max_tokens,
    }
}
