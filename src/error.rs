use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::models::FieldError;
use crate::repo::RepoError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("login required")]
    Unauthenticated { next: String },
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("internal error")]
    Internal,
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            // constraint violations are absorbed by handlers; one slipping
            // through here is a bug worth a 500, not a user-facing conflict
            RepoError::Conflict => ApiError::Internal,
            RepoError::Internal(msg) => {
                log::error!("store error: {msg}");
                ApiError::Internal
            }
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        match self {
            ApiError::Unauthenticated { next } => {
                let target = format!("/auth/login?next={}", urlencoding::encode(next));
                HttpResponse::Found()
                    .insert_header(("Location", target))
                    .finish()
            }
            ApiError::Validation(errors) => HttpResponse::BadRequest()
                .json(serde_json::json!({ "errors": errors })),
            ApiError::NotFound => HttpResponse::build(StatusCode::NOT_FOUND)
                .json(ApiErrorBody { error: self.to_string() }),
            ApiError::Forbidden => HttpResponse::build(StatusCode::FORBIDDEN)
                .json(ApiErrorBody { error: self.to_string() }),
            ApiError::Internal => HttpResponse::build(StatusCode::INTERNAL_SERVER_ERROR)
                .json(ApiErrorBody { error: self.to_string() }),
        }
    }
}
