//! JSON error responses

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tolk::{AuthErrorKind, Catalog};
use tolk_mt::MtError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Localized, user-facing messages
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

/// A failed API call, ready to render
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.into(),
                messages: Vec::new(),
            },
        }
    }

    pub fn unknown_session() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "missing or unknown session token")
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{} not found", what))
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, error)
    }

    fn with_messages(mut self, messages: Vec<String>) -> Self {
        self.body.messages = messages;
        self
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::invalid(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Errors that know their status code and localized messages
pub trait Rejection {
    fn reject(self, catalog: &Catalog, locale: &str) -> ApiError;
}

impl Rejection for tolk::Error {
    fn reject(self, catalog: &Catalog, locale: &str) -> ApiError {
        let status = match &self {
            tolk::Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            tolk::Error::NotSignedIn => StatusCode::UNAUTHORIZED,
            tolk::Error::Auth(err) => match err.kind {
                AuthErrorKind::InvalidCredential
                | AuthErrorKind::UserNotFound
                | AuthErrorKind::UserDisabled
                | AuthErrorKind::RequiresRecentLogin => StatusCode::UNAUTHORIZED,
                AuthErrorKind::EmailInUse
                | AuthErrorKind::WeakPassword
                | AuthErrorKind::InvalidEmail => StatusCode::UNPROCESSABLE_ENTITY,
                AuthErrorKind::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
                AuthErrorKind::Network | AuthErrorKind::Unknown => StatusCode::BAD_GATEWAY,
            },
            tolk::Error::Store(_) => StatusCode::BAD_GATEWAY,
            tolk::Error::Locale(_) | tolk::Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let messages = self.user_messages(catalog, locale);
        ApiError::new(status, self.to_string()).with_messages(messages)
    }
}

impl Rejection for MtError {
    fn reject(self, catalog: &Catalog, locale: &str) -> ApiError {
        let status = match &self {
            MtError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            MtError::InvalidLanguage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MtError::TranslationError(_) | MtError::NetworkError(_) | MtError::ConfigError(_) => {
                StatusCode::BAD_GATEWAY
            }
        };
        let message = self.user_message(catalog, locale);
        ApiError::new(status, self.to_string()).with_messages(vec![message])
    }
}
