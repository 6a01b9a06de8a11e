//! Mapping from domain errors to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use moltpilot_core::error::Error;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A domain error on its way out as `{ "error": "..." }`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) | Error::Auth(_) => StatusCode::BAD_REQUEST,
            Error::NetworkPolicy(_) => StatusCode::FORBIDDEN,
            Error::Upstream { .. } | Error::Provider(_) => StatusCode::BAD_GATEWAY,
            Error::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), error = %self.0, "Request failed");
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moltpilot_core::error::{ProviderError, StorageError};

    #[test]
    fn status_per_error_kind() {
        let cases = [
            (Error::Validation("x".into()), StatusCode::BAD_REQUEST),
            (Error::no_credential(), StatusCode::BAD_REQUEST),
            (Error::NetworkPolicy("evil".into()), StatusCode::FORBIDDEN),
            (
                Error::Upstream {
                    status: 429,
                    body: String::new(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                Error::Provider(ProviderError::Network("down".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (Error::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
            (
                Error::Storage(StorageError::QueryFailed("locked".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
