use actix_web::{http::StatusCode, HttpResponse, ResponseError};

use crate::error::ImageGenError;

impl ResponseError for ImageGenError {
    fn status_code(&self) -> StatusCode {
        // Upstream statuses are passed through; anything unusable becomes 502.
        StatusCode::from_u16(ImageGenError::status_code(self))
            .ok()
            .filter(|status| status.is_client_error() || status.is_server_error())
            .unwrap_or(StatusCode::BAD_GATEWAY)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(ResponseError::status_code(self)).json(self.to_body())
    }
}
