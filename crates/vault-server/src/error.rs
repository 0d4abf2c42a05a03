use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use vault_core::{AuthError, ConfigError, CsvError, QueryError, StoreError};

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_argument", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.code,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::NotFound { .. } => AppError::not_found(message),
            StoreError::Conflict { .. } => AppError::new(StatusCode::CONFLICT, "conflict", message),
            StoreError::InvalidArgument(_) => AppError::bad_request(message),
            StoreError::StorageUnavailable(_) => AppError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "storage_unavailable",
                message,
            ),
        }
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        AppError::bad_request(err.to_string())
    }
}

impl From<CsvError> for AppError {
    fn from(err: CsvError) -> Self {
        let message = err.to_string();
        match err {
            CsvError::Import(_) => AppError::new(StatusCode::BAD_REQUEST, "import_error", message),
            CsvError::EmptyExport => {
                AppError::new(StatusCode::NOT_FOUND, "empty_export", message)
            }
            CsvError::Write(_) => AppError::internal(message),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::InvalidCredentials => {
                AppError::new(StatusCode::UNAUTHORIZED, "invalid_credentials", message)
            }
            AuthError::Unauthorized(_) => AppError::unauthorized(message),
            AuthError::Expired => AppError::new(StatusCode::UNAUTHORIZED, "expired", message),
            AuthError::Forbidden => AppError::new(StatusCode::FORBIDDEN, "forbidden", message),
            AuthError::MissingSecret | AuthError::MissingIdentity | AuthError::InvalidLifetime => {
                AppError::internal(message)
            }
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::bad_request(err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status.as_str(), self.message)
    }
}

impl std::error::Error for AppError {}
