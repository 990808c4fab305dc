//! JSON error envelope: `{"detail": "..."}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::error::{ExtractError, InputError};

/// An HTTP error answered as `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl From<InputError> for ApiError {
    fn from(e: InputError) -> Self {
        match e {
            InputError::MissingInput | InputError::EmptyContent => Self::bad_request(e.to_string()),
            InputError::Extract(ref inner @ ExtractError::UnsupportedMediaType { .. }) => {
                Self::bad_request(inner.to_string())
            }
            InputError::Extract(inner) => Self::internal(inner.to_string()),
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(e: ExtractError) -> Self {
        InputError::from(e).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, detail = %self.detail, "Request failed");
        } else {
            warn!(status = %self.status, detail = %self.detail, "Request rejected");
        }
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_bad_requests() {
        assert_eq!(ApiError::from(InputError::MissingInput).status, StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(InputError::EmptyContent).status, StatusCode::BAD_REQUEST);
        let unsupported = ApiError::from(ExtractError::UnsupportedMediaType {
            media_type: "image/png".into(),
        });
        assert_eq!(unsupported.status, StatusCode::BAD_REQUEST);
        assert!(unsupported.detail.contains(".pdf"));
    }

    #[test]
    fn other_extraction_failures_are_internal() {
        let err = ApiError::from(ExtractError::Pdf("broken xref".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.detail.contains("broken xref"));
    }

    #[tokio::test]
    async fn renders_detail_envelope() {
        let response = ApiError::bad_request("Conteúdo vazio").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["detail"], "Conteúdo vazio");
    }
}
