//! Locates the generated image in an upstream response of unknown shape.
//!
//! Shapes are tried from most standard to most speculative and the first hit
//! wins:
//!
//! 1. a top-level `images` array,
//! 2. the first choice's message content (typed parts or a URL inside text),
//! 3. a depth-first walk of the whole tree for `url`, `b64_json` or `image`.

use serde_json::{Map, Value};

use crate::{encoder::is_valid_base64, models::CanonicalImageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    ImagesArray,
    MessageContent,
    DeepSearch,
}

impl ExtractionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStage::ImagesArray => "images array",
            ExtractionStage::MessageContent => "message content",
            ExtractionStage::DeepSearch => "deep search",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub image: CanonicalImageResult,
    pub stage: ExtractionStage,
}

pub fn extract(response: &Value) -> Option<Extraction> {
    let (reference, stage) = from_images_array(response)
        .map(|r| (r, ExtractionStage::ImagesArray))
        .or_else(|| from_message_content(response).map(|r| (r, ExtractionStage::MessageContent)))
        .or_else(|| deep_search(response).map(|r| (r, ExtractionStage::DeepSearch)))?;

    Some(Extraction {
        image: normalize_reference(reference),
        stage,
    })
}

/// Bare base64 gets a PNG data-URI envelope. URLs, data URIs and anything
/// that is not base64 pass through untouched.
pub fn normalize_reference(reference: String) -> CanonicalImageResult {
    if !reference.starts_with("http") && !reference.starts_with("data:") && is_valid_base64(&reference) {
        let cleaned: String = reference.chars().filter(|c| !c.is_whitespace()).collect();
        return CanonicalImageResult::new(png_data_uri(&cleaned));
    }
    CanonicalImageResult::new(reference)
}

/// The model's prose reply, if the first choice carried plain text.
pub fn text_reply(response: &Value) -> Option<String> {
    match first_message_content(response)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        _ => None,
    }
}

fn from_images_array(response: &Value) -> Option<String> {
    let first = match response.get("images") {
        Some(Value::Array(images)) => images.first()?,
        _ => return None,
    };

    match first {
        Value::String(reference) => non_empty(reference),
        Value::Object(image) => string_field(image, "url").or_else(|| string_field(image, "b64_json")),
        _ => None,
    }
}

fn from_message_content(response: &Value) -> Option<String> {
    match first_message_content(response)? {
        Value::Array(parts) => {
            // Only the first image-like part is considered.
            let part = parts.iter().find_map(|part| match part {
                Value::Object(fields) if is_image_part(fields) => Some(fields),
                _ => None,
            })?;
            let nested_url = match part.get("image_url") {
                Some(Value::Object(image_url)) => string_field(image_url, "url"),
                _ => None,
            };
            nested_url.or_else(|| string_field(part, "image"))
        }
        Value::String(text) => first_url_in_text(text),
        _ => None,
    }
}

fn first_message_content(response: &Value) -> Option<&Value> {
    let choice = match response.get("choices") {
        Some(Value::Array(choices)) => choices.first()?,
        _ => return None,
    };
    choice.get("message")?.get("content")
}

fn is_image_part(part: &Map<String, Value>) -> bool {
    matches!(part.get("type"), Some(Value::String(t)) if t == "image_url")
        || part.get("image").map(is_truthy).unwrap_or(false)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// First `http://` or `https://` run, ending at whitespace, `)`, `]` or `"`.
fn first_url_in_text(text: &str) -> Option<String> {
    for (start, _) in text.match_indices("http") {
        let rest = &text[start + 4..];
        let scheme_len = if rest.starts_with("s://") {
            4 + 4
        } else if rest.starts_with("://") {
            4 + 3
        } else {
            continue;
        };

        let candidate = &text[start..];
        let end = candidate[scheme_len..]
            .find(|c: char| c.is_whitespace() || matches!(c, ')' | ']' | '"'))
            .map(|i| scheme_len + i)
            .unwrap_or(candidate.len());

        if end > scheme_len {
            return Some(candidate[..end].to_string());
        }
    }
    None
}

/// Depth-first over every object and array in document order. JSON trees are
/// acyclic so no visited set is kept.
fn deep_search(node: &Value) -> Option<String> {
    match node {
        Value::Object(fields) => match_image_fields(fields)
            .or_else(|| fields.values().find_map(deep_search)),
        Value::Array(items) => items.iter().find_map(deep_search),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => None,
    }
}

fn match_image_fields(fields: &Map<String, Value>) -> Option<String> {
    if let Some(url) = string_field(fields, "url") {
        if url.starts_with("http") || url.starts_with("data:") {
            return Some(url);
        }
    }
    if let Some(b64) = string_field(fields, "b64_json") {
        if b64.starts_with("data:") {
            return Some(b64);
        }
        return Some(png_data_uri(&b64));
    }
    string_field(fields, "image")
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(s)) => non_empty(s),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn png_data_uri(base64_data: &str) -> String {
    format!("data:image/png;base64,{}", base64_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn url_of(response: Value) -> Option<(String, ExtractionStage)> {
        extract(&response).map(|e| (e.image.image_url, e.stage))
    }

    #[test]
    fn test_images_array_of_strings() {
        assert_eq!(
            url_of(json!({"images": ["http://x/a.png"], "choices": [{"message": {"content": "https://other"}}]})),
            Some(("http://x/a.png".into(), ExtractionStage::ImagesArray))
        );
    }

    #[test]
    fn test_images_array_object_prefers_url_then_b64() {
        assert_eq!(
            url_of(json!({"images": [{"url": "https://x/u.png", "b64_json": "AAAA"}]})).unwrap().0,
            "https://x/u.png"
        );
        assert_eq!(
            url_of(json!({"images": [{"b64_json": "AAAA"}]})),
            Some(("data:image/png;base64,AAAA".into(), ExtractionStage::ImagesArray))
        );
    }

    #[test]
    fn test_empty_images_array_falls_through() {
        assert_eq!(
            url_of(json!({"images": [], "choices": [{"message": {"content": "see https://x/y.png"}}]})),
            Some(("https://x/y.png".into(), ExtractionStage::MessageContent))
        );
    }

    #[test]
    fn test_content_parts_image_url() {
        let response = json!({
            "choices": [{"message": {"content": [
                {"type": "text", "text": "here you go"},
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}}
            ]}}]
        });
        assert_eq!(
            url_of(response),
            Some(("data:image/png;base64,AAAA".into(), ExtractionStage::MessageContent))
        );
    }

    #[test]
    fn test_content_parts_image_field() {
        let response = json!({
            "choices": [{"message": {"content": [
                {"type": "output_image", "image": "https://cdn/x.webp"}
            ]}}]
        });
        assert_eq!(url_of(response).unwrap().0, "https://cdn/x.webp");
    }

    #[test]
    fn test_url_inside_markdown_text() {
        let response = json!({
            "choices": [{"message": {"content": "Done! ![img](https://cdn.example/img.png) enjoy"}}]
        });
        assert_eq!(
            url_of(response),
            Some(("https://cdn.example/img.png".into(), ExtractionStage::MessageContent))
        );
    }

    #[test]
    fn test_first_url_stops_at_quote_and_bracket() {
        assert_eq!(
            first_url_in_text("a \"http://x/1.png\" b"),
            Some("http://x/1.png".into())
        );
        assert_eq!(first_url_in_text("[http://x/2.png]"), Some("http://x/2.png".into()));
        assert_eq!(first_url_in_text("httpx http:// https://ok"), Some("https://ok".into()));
        assert_eq!(first_url_in_text("no links here"), None);
    }

    #[test]
    fn test_deep_search_three_levels() {
        assert_eq!(
            url_of(json!({"a": {"b": {"c": {"url": "https://x/y.png"}}}})),
            Some(("https://x/y.png".into(), ExtractionStage::DeepSearch))
        );
    }

    #[test]
    fn test_deep_search_wraps_b64_json() {
        assert_eq!(
            url_of(json!({"data": [{"meta": {"b64_json": "AAAA"}}]})),
            Some(("data:image/png;base64,AAAA".into(), ExtractionStage::DeepSearch))
        );
        assert_eq!(
            url_of(json!({"x": {"b64_json": "data:image/jpeg;base64,/9j/"}})).unwrap().0,
            "data:image/jpeg;base64,/9j/"
        );
    }

    #[test]
    fn test_deep_search_ignores_relative_url_but_takes_image() {
        let response = json!({"result": {"url": "/relative/path", "nested": {"image": "https://x/z.png"}}});
        assert_eq!(url_of(response).unwrap().0, "https://x/z.png");
    }

    #[test]
    fn test_deep_search_follows_document_order() {
        let response = json!({"first": {"url": "https://x/1.png"}, "second": {"url": "https://x/2.png"}});
        assert_eq!(url_of(response).unwrap().0, "https://x/1.png");
    }

    #[test]
    fn test_bare_base64_reference_is_wrapped() {
        assert_eq!(
            url_of(json!({"images": ["iVBORw0KGgo="]})).unwrap().0,
            "data:image/png;base64,iVBORw0KGgo="
        );
    }

    #[test]
    fn test_nothing_found() {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content": "I can't help with that."}}],
            "usage": {"total_tokens": 12}
        });
        assert_eq!(extract(&response), None);
        assert_eq!(text_reply(&response).as_deref(), Some("I can't help with that."));
    }
}
