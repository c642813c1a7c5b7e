use axum::http::StatusCode;
use axum::Json;
use rusqlite::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum MimicError {
    #[error("utterance must not be empty")]
    MalformedInput,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("persistence conflict: {0}")]
    PersistenceConflict(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(String),
}

impl MimicError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PersistenceConflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MalformedInput | Self::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Busy/locked/unique races are worth another attempt; nothing else is.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::PersistenceConflict(_))
    }
}

impl From<rusqlite::Error> for MimicError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::ConstraintViolation) => {
                Self::PersistenceConflict(e.to_string())
            }
            _ => Self::StorageUnavailable(e.to_string()),
        }
    }
}

impl From<r2d2::Error> for MimicError {
    fn from(e: r2d2::Error) -> Self {
        Self::StorageUnavailable(format!("pool: {e}"))
    }
}

impl axum::response::IntoResponse for MimicError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
