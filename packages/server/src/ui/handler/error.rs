//! HTTP error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{infrastructure::dto::http::MessageResponse, usecase::UseCaseError};

/// UseCase のエラーを `{"message": ...}` とステータスコードに変換する
#[derive(Debug)]
pub struct ApiError(UseCaseError);

impl<E> From<E> for ApiError
where
    E: Into<UseCaseError>,
{
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            UseCaseError::NotFound(_) => StatusCode::NOT_FOUND,
            UseCaseError::Forbidden(_) => StatusCode::FORBIDDEN,
            UseCaseError::InvariantViolation(_) => StatusCode::CONFLICT,
            UseCaseError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            UseCaseError::Auth(_) => StatusCode::UNAUTHORIZED,
            UseCaseError::TransientStoreFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self.0);
        }
        let body = MessageResponse {
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
