use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Service error: {0}")]
    Service(#[from] crate::ServiceError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ResponseError for PortalError {
    fn status_code(&self) -> StatusCode {
        match self {
            PortalError::Service(crate::ServiceError::InvalidSubmissionIndex(_)) => {
                StatusCode::NOT_FOUND
            }
            PortalError::Service(crate::ServiceError::Multipart(_)) => StatusCode::BAD_REQUEST,
            PortalError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PortalError::BadRequest(_) => StatusCode::BAD_REQUEST,
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}
