//! Mapping of failures onto HTTP responses
//!
//! Every failure that reaches the HTTP layer becomes a JSON object with a
//! `message` and a `timestamp`. Cluster failures keep the cluster's status
//! code, malformed input is a 400, everything else is a 500.

use std::any::Any;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::cluster::ClusterFailure;
use crate::facade::FacadeError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("JSON processing error: {0}")]
    MalformedPayload(String),

    #[error("Invalid request parameter: {0}")]
    InvalidParameter(String),

    #[error("Kubernetes API error: {0}")]
    Cluster(ClusterFailure),

    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::MalformedPayload(_)
            | ApiError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::Cluster(failure) => status_from_code(failure.code),
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// HTTP status for a cluster failure code; codes that are not valid error
/// statuses become 500.
pub fn status_from_code(code: u16) -> StatusCode {
    StatusCode::from_u16(code)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Body rendered for every [`ApiError`]
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// `{"error": ...}` body used by the lifecycle endpoints
#[derive(Debug, Serialize)]
pub struct FailureBody {
    pub error: String,
}

impl FailureBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::Cluster(failure) => {
                error!(
                    "Kubernetes API error: {} - Status code: {}",
                    failure.message, failure.code
                )
            }
            ApiError::Unexpected(detail) => error!("Unexpected error: {}", detail),
            other => error!("Request rejected: {}", other),
        }

        let body = ErrorBody {
            message: self.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: match &self {
                ApiError::Cluster(failure) => Some(failure.code),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<FacadeError> for ApiError {
    fn from(err: FacadeError) -> Self {
        match err {
            FacadeError::Validation(msg) => ApiError::Validation(msg),
            FacadeError::Cluster { failure, .. } => ApiError::Cluster(failure),
            FacadeError::Unclassified(msg) => ApiError::Unexpected(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedPayload(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidParameter(rejection.body_text())
    }
}

/// Response for a handler that panicked
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Unexpected(detail).into_response()
}
