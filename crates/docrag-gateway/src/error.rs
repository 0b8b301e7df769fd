use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::api::ErrorBody;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid Authorization header format. Expected 'Bearer <api-key>' format.")]
    InvalidAuthorizationHeader,

    #[error("Authorization failed")]
    AuthorizationFailed,

    #[error("The knowledge '{0}' does not exist")]
    KnowledgeNotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] docrag_core::error::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub const INVALID_AUTHORIZATION_HEADER: u32 = 1001;
    pub const AUTHORIZATION_FAILED: u32 = 1002;
    pub const KNOWLEDGE_NOT_EXIST: u32 = 2001;

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidAuthorizationHeader | GatewayError::AuthorizationFailed => StatusCode::FORBIDDEN,
            GatewayError::KnowledgeNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Store(_) | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Knowledge-API error code; other failures reuse the HTTP status.
    pub fn code(&self) -> u32 {
        match self {
            GatewayError::InvalidAuthorizationHeader => Self::INVALID_AUTHORIZATION_HEADER,
            GatewayError::AuthorizationFailed => Self::AUTHORIZATION_FAILED,
            GatewayError::KnowledgeNotFound(_) => Self::KNOWLEDGE_NOT_EXIST,
            other => u32::from(other.status().as_u16()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "retrieval failed");
        }
        let body = ErrorBody { error_code: self.code(), error_msg: self.to_string() };
        (status, Json(body)).into_response()
    }
}
