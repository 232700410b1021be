//! Centralized error types for the Playlink core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::clients::DeliveryError;
use crate::dispatcher::DispatchError;
use crate::engine::EngineError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for EngineError {
    fn code(&self) -> &'static str {
        match self {
            Self::Busy(_) => "engine_busy",
            Self::NotInitialized => "engine_not_initialized",
            Self::InitFailed(_) => "engine_init_failed",
        }
    }
}

impl ErrorCode for DispatchError {
    fn code(&self) -> &'static str {
        match self {
            Self::MalformedCommand(_) => "malformed_command",
            Self::SessionClosed => "session_closed",
        }
    }
}

impl ErrorCode for DeliveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::Disconnected => "client_disconnected",
            Self::Backlogged => "client_backlogged",
        }
    }
}

/// Application-wide error type for the Playlink server.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum PlaylinkError {
    /// The session actor has stopped.
    #[error("Session unavailable: {0}")]
    SessionUnavailable(String),

    /// Client sent an invalid or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Bind attempted with a protocol this service does not speak.
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// Server configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PlaylinkError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionUnavailable(_) => "session_unavailable",
            Self::InvalidRequest(_) => "invalid_request",
            Self::UnsupportedProtocol(_) => "unsupported_protocol",
            Self::Configuration(_) => "configuration_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::UnsupportedProtocol(_) => StatusCode::BAD_REQUEST,
            Self::SessionUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type PlaylinkResult<T> = Result<T, PlaylinkError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for PlaylinkError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<DispatchError> for PlaylinkError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::MalformedCommand(reason) => Self::InvalidRequest(reason),
            DispatchError::SessionClosed => Self::SessionUnavailable(err.to_string()),
        }
    }
}
