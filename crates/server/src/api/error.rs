//! Error responses for API handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use cratedigger_core::{CrawlError, FetchError, PipelineError, StoreError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub quota_exceeded: bool,
}

/// An error rendered as a JSON body with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    quota_exceeded: bool,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            quota_exceeded: false,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unavailable(component: &str) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("{} not configured", component),
        )
    }

    pub fn quota_exceeded() -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "API quota exceeded".to_string(),
            quota_exceeded: true,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed: {}", self.message);
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
                quota_exceeded: self.quota_exceeded,
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let status = match &e {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Duplicate(_) => StatusCode::CONFLICT,
            StoreError::Unavailable(_) | StoreError::NotSupported(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        if e.is_quota() {
            return Self::quota_exceeded();
        }
        let status = match &e {
            FetchError::NotFound(_) => StatusCode::NOT_FOUND,
            FetchError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::QuotaExceeded => Self::quota_exceeded(),
            PipelineError::Fetch(e) => e.into(),
            PipelineError::Store(e) => e.into(),
            PipelineError::InvalidInput(msg) => Self::bad_request(msg),
        }
    }
}

impl From<CrawlError> for ApiError {
    fn from(e: CrawlError) -> Self {
        match e {
            CrawlError::QuotaExceeded => Self::quota_exceeded(),
            CrawlError::AlreadyRunning => Self::new(StatusCode::CONFLICT, e.to_string()),
            CrawlError::Store(e) => e.into(),
            CrawlError::Pipeline(e) => e.into(),
        }
    }
}
