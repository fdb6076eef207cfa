use serde_json::Value;

use crate::error::ImageGenError;

/// Whether a provider error message is about an exhausted balance.
///
/// This is a string heuristic over free-form provider text, not a contract.
/// Replace it with a structured error code check if the provider ever offers
/// one.
pub fn mentions_insufficient_credits(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("credits") || message.contains("402")
}

/// Maps a non-success generation response to the error taxonomy.
pub fn classify_upstream_failure(status: u16, body: &str) -> ImageGenError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|value| value.get("error"));

    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            let raw = body.trim();
            (parsed.is_none() && !raw.is_empty()).then(|| raw.to_string())
        })
        .unwrap_or_else(|| "Unknown error".to_string());

    if mentions_insufficient_credits(&message) {
        return ImageGenError::InsufficientCredits(message);
    }

    let details = error
        .and_then(|e| e.get("metadata"))
        .filter(|metadata| !metadata.is_null())
        .cloned()
        .unwrap_or_else(|| Value::String(message.clone()));

    ImageGenError::Upstream {
        status,
        message,
        details,
    }
}
