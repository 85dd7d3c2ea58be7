pub mod handlers;
pub mod jobs;
pub mod media;
pub mod middleware;
pub mod routes;

use axum::{http::StatusCode, Json};
use nullfetch_core::{ResolveError, ServiceError, SessionError};
use serde::Serialize;

pub use routes::create_router;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: &str) -> Self {
        Self {
            error: error.into(),
            code: code.to_string(),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a service failure to its HTTP status.
pub fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::Session(SessionError::Expired) => StatusCode::GONE,
        ServiceError::Session(SessionError::IndexOutOfRange { .. })
        | ServiceError::InvalidKind(_)
        | ServiceError::EmptyKeyword
        | ServiceError::EntryOutOfRange { .. } => StatusCode::BAD_REQUEST,
        ServiceError::Resolve(ResolveError::MissingExternalId)
        | ServiceError::Resolve(ResolveError::KindDisabled(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ServiceError::Resolve(ResolveError::NoResourceAvailable) => StatusCode::NOT_FOUND,
        ServiceError::Resolve(ResolveError::Provider(_))
        | ServiceError::Provider(_)
        | ServiceError::Transfer(_) => StatusCode::BAD_GATEWAY,
    }
}

pub fn service_error(error: ServiceError) -> ApiError {
    (
        status_for(&error),
        Json(ErrorResponse::new(error.to_string(), error.code())),
    )
}
