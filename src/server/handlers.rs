use actix_web::{http::header::AUTHORIZATION, web, HttpRequest, HttpResponse};
use serde_json::{json, Value};

use crate::{
    error::{ImageGenError, Result},
    models::{supported_models, Credential, GenerateImageBody, GenerateImageResponse, STYLE_PRESETS},
    server::AppState,
    settings::ClientContext,
};

/// POST /api/generate-image
///
/// The body is read as raw JSON regardless of `Content-Type`.
pub async fn generate_image(state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse> {
    let value: Value = serde_json::from_slice(&body).map_err(|e| {
        log::warn!("Rejected request body: {}", e);
        ImageGenError::validation("Invalid request body.", e.to_string())
    })?;
    let body = GenerateImageBody::from_json(&value);
    let context = ClientContext::from_request(
        body.api_key.as_deref(),
        body.model.as_deref(),
        &state.config.default_model,
    );

    let image = state
        .pipeline
        .run(&context, body.prompt.as_deref(), body.image_data.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(GenerateImageResponse {
        image_url: image.image_url,
        success: true,
    }))
}

/// GET /api/credits
pub async fn credits(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let credential = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(Credential::from_bearer);

    let account = state
        .pipeline
        .client()
        .fetch_credits(credential.as_ref())
        .await?;
    Ok(HttpResponse::Ok().json(account))
}

/// GET /api/models
pub async fn list_models(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(supported_models(&state.config.default_model))
}

/// GET /api/presets
pub async fn list_presets() -> HttpResponse {
    HttpResponse::Ok().json(&STYLE_PRESETS[..])
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
