use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use log::warn;
use serde_json::json;
use vanguard::form::FormError;
use vanguard::reactions::ReactionError;
use vanguard::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    BadRequest(String),
    #[error("missing or invalid x-vanguard-user header")]
    Unauthorized,
    #[error("not allowed")]
    Forbidden,
    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PostNotFound(_) | StoreError::CommentNotFound(_) => ApiError::NotFound,
            StoreError::UnknownCategory(_) | StoreError::InvalidParent { .. } => ApiError::BadRequest(err.to_string()),
            StoreError::Internal => {
                warn!("store failure: {err}");
                ApiError::Internal
            }
        }
    }
}

impl From<FormError> for ApiError {
    fn from(err: FormError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<ReactionError> for ApiError {
    fn from(err: ReactionError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
