use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type AppResult<T> = Result<T, AppError>;

/// Ways the anti-forgery token can fail to materialise.
#[derive(thiserror::Error, Debug)]
pub enum CsrfError {
    #[error("csrf bootstrap returned {status}")]
    Bootstrap { status: u16 },
    #[error("csrf bootstrap request failed: {0}")]
    Transport(String),
    #[error("XSRF-TOKEN cookie still absent after {attempts} checks")]
    CookieMissing { attempts: u32 },
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("malformed session data: {0}")]
    MalformedSession(String),
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("csrf token unavailable: {0}")]
    Csrf(#[from] CsrfError),
    #[error("backend responded with status {status}")]
    Upstream { status: u16 },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn malformed_session(message: impl Into<String>) -> Self {
        Self::MalformedSession(message.into())
    }

    pub fn unknown_role(role: impl Into<String>) -> Self {
        Self::UnknownRole(role.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Maps a non-success backend status: 401 proves the session is gone,
    /// anything else only says the call failed.
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            Self::Unauthenticated
        } else {
            Self::Upstream {
                status: status.as_u16(),
            }
        }
    }

    /// True when the failure proves there is no valid session. Network and
    /// server failures return false: retrying may succeed.
    pub fn is_definitely_unauthenticated(&self) -> bool {
        matches!(
            self,
            AppError::Unauthenticated | AppError::MalformedSession(_) | AppError::UnknownRole(_)
        )
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::MalformedSession(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownRole(_) => StatusCode::FORBIDDEN,
            AppError::Csrf(_) => StatusCode::BAD_GATEWAY,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Http(_) => StatusCode::BAD_GATEWAY,
            AppError::Decode(_) => StatusCode::BAD_GATEWAY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = self.to_string();
        let error = match &self {
            AppError::Unauthenticated => "unauthenticated",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::MalformedSession(_) => "malformed_session",
            AppError::UnknownRole(_) => "unknown_role",
            AppError::Csrf(_) => "csrf",
            AppError::Upstream { .. } => "upstream",
            AppError::Http(_) => "http",
            AppError::Decode(_) => "decode",
            AppError::BadRequest(_) => "bad_request",
            AppError::Configuration(_) => "configuration",
            AppError::Database(_) => "database",
            AppError::Internal(_) => "internal",
        };

        let payload = ErrorResponse {
            error: error.to_string(),
            message,
        };

        (status, Json(payload)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_separates_401_from_server_failures() {
        assert!(matches!(
            AppError::from_status(reqwest::StatusCode::UNAUTHORIZED),
            AppError::Unauthenticated
        ));
        assert!(matches!(
            AppError::from_status(reqwest::StatusCode::SERVICE_UNAVAILABLE),
            AppError::Upstream { status: 503 }
        ));
    }

    #[test]
    fn only_session_proofs_count_as_definitely_unauthenticated() {
        assert!(AppError::Unauthenticated.is_definitely_unauthenticated());
        assert!(AppError::unknown_role("Intern").is_definitely_unauthenticated());
        assert!(!AppError::Upstream { status: 500 }.is_definitely_unauthenticated());
        assert!(!AppError::from(CsrfError::CookieMissing { attempts: 3 }).is_definitely_unauthenticated());
    }
}
