pub mod handlers;
pub mod response;

use actix_web::{middleware::Logger, web, App, HttpServer};

use crate::{
    config::Config,
    error::{ImageGenError, Result},
    pipeline::GenerationPipeline,
    upstream::OpenRouterClient,
};

/// Immutable per-process state shared by all workers.
pub struct AppState {
    pub config: Config,
    pub pipeline: GenerationPipeline,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let client = OpenRouterClient::new(config.upstream.clone())?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: Config, client: OpenRouterClient) -> Self {
        Self {
            config,
            pipeline: GenerationPipeline::new(client),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, max_body_bytes: usize) {
    cfg.app_data(web::PayloadConfig::new(max_body_bytes))
    .route("/health", web::get().to(handlers::health))
    .service(
        web::scope("/api")
            .route("/generate-image", web::post().to(handlers::generate_image))
            .route("/credits", web::get().to(handlers::credits))
            .route("/models", web::get().to(handlers::list_models))
            .route("/presets", web::get().to(handlers::list_presets)),
    );
}

pub async fn run_server(config: Config) -> Result<()> {
    let bind = (config.host.clone(), config.port());
    let max_body_bytes = config.max_body_bytes;
    let state = web::Data::new(AppState::new(config)?);

    log::info!("🌐 Listening on http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            // Request bodies carry the API key, so only the request line is logged.
            .wrap(Logger::new("%r %s %Dms"))
            .configure(|cfg| configure(cfg, max_body_bytes))
    })
    .bind(bind)
    .map_err(|e| ImageGenError::Config(format!("Failed to bind server: {}", e)))?
    .run()
    .await
    .map_err(|e| ImageGenError::Config(format!("Server error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::UpstreamConfig,
        models::{ErrorBody, GenerateImageResponse},
        upstream::client::tests::FakeTransport,
    };
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn state(transport: Arc<FakeTransport>) -> web::Data<AppState> {
        let client = OpenRouterClient::with_transport(UpstreamConfig::new(), transport);
        web::Data::new(AppState::with_client(Config::new(), client))
    }

    macro_rules! app {
        ($transport:expr) => {
            test::init_service(
                App::new()
                    .app_data(state($transport))
                    .configure(|cfg| configure(cfg, 1024 * 1024)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_generate_returns_image_url() {
        let transport = FakeTransport::replying(200, json!({"images": ["http://x/a.png"]}));
        let app = app!(transport.clone());

        let req = test::TestRequest::post()
            .uri("/api/generate-image")
            .set_json(json!({"prompt": "a fox", "apiKey": "sk-1", "model": "black-forest-labs/flux-pro"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: GenerateImageResponse = test::read_body_json(resp).await;
        assert_eq!(body.image_url, "http://x/a.png");
        assert!(body.success);

        let sent = transport.calls()[0].body.clone().unwrap();
        assert_eq!(sent["model"], "black-forest-labs/flux-pro");
    }

    #[actix_web::test]
    async fn test_generate_missing_key_is_401() {
        let transport = Arc::new(FakeTransport::default());
        let app = app!(transport.clone());

        let req = test::TestRequest::post()
            .uri("/api/generate-image")
            .set_json(json!({"prompt": "a fox"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.error, "API Key is missing.");
        assert!(transport.calls().is_empty());
    }

    #[actix_web::test]
    async fn test_generate_blank_prompt_is_400() {
        let app = app!(Arc::new(FakeTransport::default()));
        let req = test::TestRequest::post()
            .uri("/api/generate-image")
            .set_json(json!({"prompt": "  ", "apiKey": "sk-1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_generate_invalid_image_is_400() {
        let app = app!(Arc::new(FakeTransport::default()));
        let req = test::TestRequest::post()
            .uri("/api/generate-image")
            .set_json(json!({"prompt": "a fox", "apiKey": "sk-1", "imageData": "%%%%"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.error, "Invalid image data provided.");
    }

    #[actix_web::test]
    async fn test_generate_non_string_prompt_is_400() {
        let transport = Arc::new(FakeTransport::default());
        let app = app!(transport.clone());
        let req = test::TestRequest::post()
            .uri("/api/generate-image")
            .set_json(json!({"prompt": 42, "apiKey": "sk-1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.error, "A prompt is required.");
        assert!(transport.calls().is_empty());
    }

    #[actix_web::test]
    async fn test_generate_missing_key_wins_over_bad_prompt_type() {
        let app = app!(Arc::new(FakeTransport::default()));
        let req = test::TestRequest::post()
            .uri("/api/generate-image")
            .set_json(json!({"prompt": 42}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.error, "API Key is missing.");
    }

    #[actix_web::test]
    async fn test_generate_accepts_json_without_json_content_type() {
        let transport = FakeTransport::replying(200, json!({"images": ["http://x/a.png"]}));
        let app = app!(transport.clone());
        let req = test::TestRequest::post()
            .uri("/api/generate-image")
            .insert_header(("Content-Type", "text/plain"))
            .set_payload(r#"{"prompt": "a fox", "apiKey": "sk-1"}"#)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: GenerateImageResponse = test::read_body_json(resp).await;
        assert_eq!(body.image_url, "http://x/a.png");
        assert_eq!(transport.calls().len(), 1);
    }

    #[actix_web::test]
    async fn test_generate_malformed_json_is_400() {
        let transport = Arc::new(FakeTransport::default());
        let app = app!(transport.clone());
        let req = test::TestRequest::post()
            .uri("/api/generate-image")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.error, "Invalid request body.");
        assert!(transport.calls().is_empty());
    }

    #[actix_web::test]
    async fn test_generate_insufficient_credits_is_402() {
        let transport = FakeTransport::replying(
            402,
            json!({"error": {"message": "You need more credits to use this model"}}),
        );
        let app = app!(transport);
        let req = test::TestRequest::post()
            .uri("/api/generate-image")
            .set_json(json!({"prompt": "a fox", "apiKey": "sk-1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.error, "Insufficient credits.");
    }

    #[actix_web::test]
    async fn test_generate_passes_upstream_status_through() {
        let transport = FakeTransport::replying(
            429,
            json!({"error": {"message": "Rate limit exceeded", "metadata": {"provider_name": "Google"}}}),
        );
        let app = app!(transport);
        let req = test::TestRequest::post()
            .uri("/api/generate-image")
            .set_json(json!({"prompt": "a fox", "apiKey": "sk-1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.error, "Rate limit exceeded");
        assert_eq!(body.details, json!({"provider_name": "Google"}));
    }

    #[actix_web::test]
    async fn test_generate_without_image_is_500_not_found() {
        let transport = FakeTransport::replying(
            200,
            json!({"choices": [{"message": {"content": "Sorry, I can't do that."}}]}),
        );
        let app = app!(transport);
        let req = test::TestRequest::post()
            .uri("/api/generate-image")
            .set_json(json!({"prompt": "a fox", "apiKey": "sk-1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.error, "No valid response from the API.");
    }

    #[actix_web::test]
    async fn test_response_never_echoes_api_key() {
        let transport = FakeTransport::replying(500, json!({"error": {"message": "boom"}}));
        let app = app!(transport);
        let req = test::TestRequest::post()
            .uri("/api/generate-image")
            .set_json(json!({"prompt": "a fox", "apiKey": "sk-or-very-secret"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body = test::read_body(resp).await;
        assert!(!String::from_utf8_lossy(&body).contains("sk-or-very-secret"));
    }

    #[actix_web::test]
    async fn test_credits_requires_bearer_header() {
        let transport = Arc::new(FakeTransport::default());
        let app = app!(transport.clone());

        let req = test::TestRequest::get()
            .uri("/api/credits")
            .insert_header(("Authorization", "sk-no-bearer"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(transport.calls().is_empty());
    }

    #[actix_web::test]
    async fn test_credits_passes_account_info_through() {
        let info = json!({"data": {"label": "k", "usage": 2.0, "limit": 5.0, "is_free_tier": false}});
        let transport = FakeTransport::replying(200, info.clone());
        let app = app!(transport.clone());

        let req = test::TestRequest::get()
            .uri("/api/credits")
            .insert_header(("Authorization", "Bearer sk-1"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, info);

        let calls = transport.calls();
        assert!(calls[0]
            .headers
            .iter()
            .any(|(n, v)| n == "Authorization" && v == "Bearer sk-1"));
    }

    #[actix_web::test]
    async fn test_catalog_endpoints() {
        let app = app!(Arc::new(FakeTransport::default()));

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/models").to_request()).await;
        let models: Value = test::read_body_json(resp).await;
        assert_eq!(models.as_array().unwrap().len(), 4);
        assert_eq!(models[0]["id"], "google/gemini-2.5-flash-image-preview");
        assert_eq!(models[0]["default"], true);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/presets").to_request()).await;
        let presets: Value = test::read_body_json(resp).await;
        assert_eq!(presets[0]["id"], "cinematic");

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
