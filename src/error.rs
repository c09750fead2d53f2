use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use tracing::error;

use crate::repo::RepoError;
use crate::usecases::UseCaseError;

const SERVER_FAILURE: &str = "terjadi kegagalan pada server kami";

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub status: &'static str,
    pub message: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")] BadRequest(String),
    #[error("{0}")] Forbidden(String),
    #[error("{0}")] NotFound(String),
    #[error("internal error")] Internal,
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(msg) => ApiError::NotFound(msg.to_string()),
            RepoError::Forbidden(msg) => ApiError::Forbidden(msg.to_string()),
            RepoError::Internal(detail) => {
                error!("repository failure: {detail}");
                ApiError::Internal
            }
        }
    }
}

impl From<UseCaseError> for ApiError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::Repo(e) => e.into(),
            UseCaseError::Validation(v) if v.entity().is_client_payload() => ApiError::BadRequest(v.message()),
            // a detail view failing validation means stored data is malformed
            UseCaseError::Validation(v) => {
                error!("invalid stored data: {v}");
                ApiError::Internal
            }
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let (status, body) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, ApiErrorBody { status: "fail", message: m.clone() }),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, ApiErrorBody { status: "fail", message: m.clone() }),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, ApiErrorBody { status: "fail", message: m.clone() }),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody { status: "error", message: SERVER_FAILURE.to_string() },
            ),
        };
        HttpResponse::build(status).json(body)
    }
}
