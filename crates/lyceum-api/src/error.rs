// Lyceum
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Error handling for the RBAC HTTP API
//! Implements RFC 7807 Problem Details format

use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use lyceum_authz::AuthzError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};

/// API error types following REST conventions
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Method not allowed: {message}")]
    MethodNotAllowed { message: String },

    #[error("Payload too large: {message}")]
    PayloadTooLarge { message: String },

    #[error("Internal server error: {message}")]
    InternalServerError { message: String },

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Malformed JSON: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } | ApiError::SerdeJsonError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } | ApiError::JwtError(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Authz(err) => match err {
                AuthzError::UnknownPermission { .. } | AuthzError::EmptyPermissionSet | AuthzError::InvalidRole { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                AuthzError::DuplicateKey { .. } | AuthzError::RoleInUse { .. } | AuthzError::ConcurrentModification { .. } | AuthzError::SystemRoleImmutable { .. } => {
                    StatusCode::CONFLICT
                }
                AuthzError::Forbidden { .. } | AuthzError::NoAssignment { .. } => StatusCode::FORBIDDEN,
                AuthzError::NotFound { .. } => StatusCode::NOT_FOUND,
                AuthzError::Storage { .. } | AuthzError::InvalidCatalog { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InternalServerError { .. } | ApiError::IoError(_) | ApiError::HttpError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::Unauthorized { .. } => "unauthorized",
            ApiError::NotFound { .. } => "not_found",
            ApiError::MethodNotAllowed { .. } => "method_not_allowed",
            ApiError::PayloadTooLarge { .. } => "payload_too_large",
            ApiError::Authz(err) if err.is_internal() => "internal_error",
            ApiError::Authz(err) => err.code(),
            ApiError::JwtError(_) => "invalid_token",
            ApiError::SerdeJsonError(_) => "json_error",
            ApiError::InternalServerError { .. } | ApiError::IoError(_) | ApiError::HttpError(_) => "internal_error",
        }
    }

    /// Message safe to show to clients; internal failures never leak their cause
    pub fn public_detail(&self) -> String {
        if self.status_code().is_server_error() {
            return "An internal error occurred".to_string();
        }
        match self {
            ApiError::JwtError(_) => "Invalid or expired token".to_string(),
            other => other.to_string(),
        }
    }

    /// Build the problem+json response for this error
    pub fn into_response(self, instance: &str) -> Response<Full<Bytes>> {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            error!(status = %status_code, instance = %instance, error = %self, "API error");
        } else {
            warn!(status = %status_code, instance = %instance, error = %self, "Request rejected");
        }

        let problem_details = ProblemDetails::new(&self, instance.to_string());

        // Serialize problem details
        let json = match serde_json::to_string(&problem_details) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize error response: {}", e);
                r#"{"type":"/problems/internal_error","title":"Internal Server Error","status":500,"detail":"An internal error occurred","instance":"/"}"#.to_string()
            }
        };

        let mut response = Response::new(Full::new(Bytes::from(json)));
        *response.status_mut() = status_code;
        response.headers_mut().insert(hyper::header::CONTENT_TYPE, hyper::header::HeaderValue::from_static("application/problem+json"));
        response.headers_mut().insert(hyper::header::CACHE_CONTROL, hyper::header::HeaderValue::from_static("no-cache"));
        response
    }
}

/// RFC 7807 Problem Details response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// A URI reference that identifies the problem type
    #[serde(rename = "type")]
    pub problem_type: String,

    /// A short, human-readable summary of the problem type
    pub title: String,

    /// The HTTP status code generated by the origin server
    pub status: u16,

    /// A human-readable explanation specific to this occurrence
    pub detail: String,

    /// A URI reference that identifies the specific occurrence
    pub instance: String,

    /// Additional extension members
    #[serde(flatten)]
    pub extensions: HashMap<String, serde_json::Value>,
}

impl ProblemDetails {
    pub fn new(error: &ApiError, instance: String) -> Self {
        let status_code = error.status_code();

        let problem = Self {
            problem_type: format!("/problems/{}", error.error_type()),
            title: status_code.canonical_reason().unwrap_or("Unknown Error").to_string(),
            status: status_code.as_u16(),
            detail: error.public_detail(),
            instance,
            extensions: HashMap::new(),
        };

        match error {
            ApiError::Authz(AuthzError::ConcurrentModification { expected, actual, .. }) => problem
                .with_extension("retryable", serde_json::Value::Bool(true))
                .with_extension("expected_version", (*expected).into())
                .with_extension("actual_version", (*actual).into()),
            ApiError::Authz(AuthzError::DuplicateKey { key, .. }) => problem.with_extension("key", key.clone().into()),
            ApiError::Authz(AuthzError::UnknownPermission { key }) => problem.with_extension("permission", key.clone().into()),
            ApiError::Authz(AuthzError::RoleInUse { assignments, .. }) => problem.with_extension("assignments", (*assignments).into()),
            _ => problem,
        }
    }

    /// Add extension data to the problem details
    pub fn with_extension(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extensions.insert(key.to_string(), value);
        self
    }
}

/// Convert ApiError to HTTP response
impl From<ApiError> for Response<Full<Bytes>> {
    fn from(error: ApiError) -> Self {
        error.into_response("/")
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

impl From<hyper::http::Error> for ApiError {
    fn from(err: hyper::http::Error) -> Self {
        ApiError::HttpError(err.to_string())
    }
}
