use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::DomainError;
use serde_json::json;

/// A [`DomainError`] on its way out as `{ "code", "message", "status" }`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status =
            StatusCode::from_u16(code.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(code = ?code, error = %self.0, "request failed");
        } else {
            tracing::debug!(code = ?code, error = %self.0, "request rejected");
        }

        let body = Json(json!({
            "code": code,
            "message": self.0.to_string(),
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}

/// Plain 404 for operations the services answer with `false`.
pub(super) fn not_found(entity: &str, id: impl ToString) -> ApiError {
    ApiError(DomainError::not_found(entity, id))
}
