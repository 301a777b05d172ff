use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bitme_core::{StorageError, WriteErrorKind};
use thiserror::Error;
use tracing::{error, warn};

use crate::model::ErrorResponse;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("no free code pair after {0} attempts")]
    CodesExhausted(usize),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::CodesExhausted(_) => StatusCode::CONFLICT,
            AppError::Storage(err) => match err {
                StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                StorageError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                StorageError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
                StorageError::Write { kind, .. } => match kind {
                    WriteErrorKind::DuplicateKey => StatusCode::CONFLICT,
                    WriteErrorKind::Unregistered => StatusCode::NOT_FOUND,
                    WriteErrorKind::Constraint | WriteErrorKind::Other => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                },
                StorageError::Read(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else if status == StatusCode::CONFLICT {
            warn!(error = %self, "request conflicted");
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_statuses() {
        let cases = [
            (StorageError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                StorageError::InvalidArgument("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (StorageError::duplicate_key("x"), StatusCode::CONFLICT),
            (StorageError::unregistered("x"), StatusCode::NOT_FOUND),
            (
                StorageError::Connection("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                StorageError::Read("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                StorageError::write(WriteErrorKind::Constraint, "x"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn gateway_errors_map_to_statuses() {
        assert_eq!(
            AppError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::CodesExhausted(3).status(), StatusCode::CONFLICT);
    }
}
