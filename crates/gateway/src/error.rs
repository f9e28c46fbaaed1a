//! HTTP error responses.
//!
//! The generate endpoint answers `{success:false, error:{message}}`; the
//! history endpoint answers `{error}`. Internal details are logged, never
//! returned.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use codeweaver_core::error::{Error, StoreError, ValidationError};
use serde::Serialize;
use tracing::error;

/// Failure of `POST /api/generate`.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Validation(ValidationError),
    Unavailable,
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Unauthorized: sign in required".into(),
            ApiError::Validation(e) => e.to_string(),
            ApiError::Unavailable => "Generation service unavailable".into(),
            ApiError::Internal => "Internal server error".into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(v) => ApiError::Validation(v),
            other if other.is_unavailable() => {
                error!(error = %other, "Generate failed: dependency unavailable");
                ApiError::Unavailable
            }
            other => {
                error!(error = %other, "Generate failed");
                ApiError::Internal
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Error::from(e).into()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e)
    }
}

#[derive(Serialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: ErrorDetail,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            success: false,
            error: ErrorDetail {
                message: self.message(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Failure of `GET /api/history`.
#[derive(Debug)]
pub enum HistoryError {
    Unauthorized,
    FetchFailed(StoreError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl From<StoreError> for HistoryError {
    fn from(e: StoreError) -> Self {
        HistoryError::FetchFailed(e)
    }
}

impl IntoResponse for HistoryError {
    fn into_response(self) -> Response {
        match self {
            HistoryError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Unauthorized",
                }),
            )
                .into_response(),
            HistoryError::FetchFailed(e) => {
                error!(error = %e, "History fetch failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Fetch failed",
                    }),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeweaver_core::error::ProviderError;

    #[test]
    fn store_unavailable_maps_to_503() {
        let err: ApiError = StoreError::Unavailable("pool timed out".into()).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.message(), "Generation service unavailable");
    }

    #[test]
    fn upstream_network_maps_to_503() {
        let err: ApiError = Error::Provider(ProviderError::Network("reset".into())).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn query_failure_maps_to_500() {
        let err: ApiError = StoreError::Query("constraint".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Internal server error");
    }

    #[test]
    fn validation_message_is_field_qualified() {
        let err: ApiError = ValidationError::new("prompt", "Required").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "prompt: Required");
    }
}
