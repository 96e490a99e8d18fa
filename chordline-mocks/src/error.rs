//! Error responses for the mock servers
//!
//! Each provider has its own error envelope; the variant carries the
//! provider so `IntoResponse` can shape the body the way the real API does.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chordline_common::Provider;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MockError {
    /// Missing or unrecognised credential (401)
    #[error("Unauthorized ({provider}): {message}")]
    Unauthorized { provider: Provider, message: String },

    /// Missing or malformed parameter (400)
    #[error("Bad request ({provider}): {message}")]
    BadRequest { provider: Provider, message: String },

    /// Unknown resource (404)
    #[error("Not found ({provider}): {message}")]
    NotFound { provider: Provider, message: String },
}

impl MockError {
    pub fn unauthorized(provider: Provider, message: impl Into<String>) -> Self {
        MockError::Unauthorized { provider, message: message.into() }
    }

    pub fn bad_request(provider: Provider, message: impl Into<String>) -> Self {
        MockError::BadRequest { provider, message: message.into() }
    }

    pub fn not_found(provider: Provider, message: impl Into<String>) -> Self {
        MockError::NotFound { provider, message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            MockError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            MockError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            MockError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    fn parts(&self) -> (Provider, &str) {
        match self {
            MockError::Unauthorized { provider, message }
            | MockError::BadRequest { provider, message }
            | MockError::NotFound { provider, message } => (*provider, message),
        }
    }
}

/// Error body in the provider's own envelope
pub fn error_body(provider: Provider, status: StatusCode, message: &str) -> Value {
    let code = status.as_u16();
    match provider {
        Provider::GoogleCalendar => json!({ "error": { "code": code, "message": message } }),
        Provider::Spotify => json!({ "error": { "status": code, "message": message } }),
        Provider::OpenWeather => json!({ "cod": code, "message": message }),
        Provider::Mapbox => json!({ "message": message }),
        Provider::OpenRouter => json!({
            "error": { "message": message, "type": "invalid_request_error" }
        }),
    }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (provider, message) = self.parts();
        tracing::debug!(%provider, status = status.as_u16(), "{}", message);
        (status, Json(error_body(provider, status, message))).into_response()
    }
}

/// Unwrap a JSON body, turning extractor rejections into provider-shaped 400s
pub fn json_body(provider: Provider, body: Result<Json<Value>, JsonRejection>) -> Result<Value, MockError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| MockError::bad_request(provider, rejection.body_text()))
}

pub type MockResult<T> = Result<T, MockError>;
