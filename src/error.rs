use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;

pub type AppResult<T> = Result<T, AppError>;

/// Machine-readable error codes carried alongside every error message.
/// Clients branch on the code, never on the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    Unauthorized,
    DailyLimitExceeded,
    UnsafeContent,
    GenerationFailed,
    GenerationTimeout,
    NotFound,
    CannotRemoveOwn,
    InternalError,
}

impl ErrorCode {
    fn status(self) -> StatusCode {
        match self {
            Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::DailyLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::UnsafeContent | Self::CannotRemoveOwn => StatusCode::UNPROCESSABLE_ENTITY,
            Self::GenerationFailed => StatusCode::BAD_GATEWAY,
            Self::GenerationTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    code: ErrorCode,
    message: String,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            ErrorCode::Unauthorized,
            "Musisz być zalogowany, aby wykonać tę operację.",
        )
    }

    pub fn daily_limit_exceeded() -> Self {
        Self::new(
            ErrorCode::DailyLimitExceeded,
            "Dzienny limit generowań został wyczerpany. Spróbuj jutro.",
        )
    }

    pub fn unsafe_content() -> Self {
        Self::new(
            ErrorCode::UnsafeContent,
            "Opis zawiera treści nieodpowiednie dla dzieci.",
        )
    }

    pub fn generation_failed() -> Self {
        Self::new(
            ErrorCode::GenerationFailed,
            "Nie udało się wygenerować kolorowanki. Spróbuj ponownie.",
        )
    }

    pub fn generation_timeout() -> Self {
        Self::new(
            ErrorCode::GenerationTimeout,
            "Generowanie trwało zbyt długo. Spróbuj ponownie.",
        )
    }

    pub fn not_found() -> Self {
        Self::new(ErrorCode::NotFound, "Nie znaleziono kolorowanki.")
    }

    pub fn cannot_remove_own() -> Self {
        Self::new(
            ErrorCode::CannotRemoveOwn,
            "Nie można usunąć własnej wygenerowanej kolorowanki z biblioteki.",
        )
    }

    pub fn internal<E: Display>(error: E) -> Self {
        Self::new(ErrorCode::InternalError, error.to_string())
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        let body = Json(ErrorEnvelope {
            error: ErrorBody {
                code: self.code,
                message: self.message,
            },
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: ErrorCode,
    message: String,
}

impl From<diesel::result::Error> for AppError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => AppError::not_found(),
            _ => AppError::internal(value),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::internal(value)
    }
}
