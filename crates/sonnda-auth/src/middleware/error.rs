//! Error response handling.
//!
//! This module implements `IntoResponse` for `AuthError`. Client errors
//! carry their message; server errors are logged and rendered with a
//! generic message only.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        let code = self.error_code();

        let body = if self.is_server_error() {
            tracing::error!(error = %self, category = %self.category(), "Request failed");
            json!({ "error": code, "message": "internal server error" })
        } else {
            match &self {
                AuthError::Validation { field, message } => json!({
                    "error": code,
                    "field": field,
                    "message": message,
                }),
                AuthError::Unauthenticated { message } | AuthError::Forbidden { message } => {
                    json!({ "error": code, "message": message })
                }
                other => json!({ "error": code, "message": other.to_string() }),
            }
        };

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            headers.insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"sonnda\""),
            );
        }

        (status, headers, Json(body)).into_response()
    }
}

fn status_code(error: &AuthError) -> StatusCode {
    match error {
        AuthError::Validation { .. } => StatusCode::BAD_REQUEST,
        AuthError::EmailTaken => StatusCode::CONFLICT,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
        AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
        AuthError::InvalidTransition { .. } => StatusCode::CONFLICT,
        AuthError::NotFound { .. } => StatusCode::NOT_FOUND,
        AuthError::DuplicateKey { .. } => StatusCode::CONFLICT,
        AuthError::Conflict { .. } => StatusCode::CONFLICT,
        AuthError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        AuthError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        AuthError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
