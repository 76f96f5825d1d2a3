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

//! Health check handlers

use super::json_response;
use crate::error::ApiResult;
use crate::models::HealthResponse;
use chrono::Utc;
use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use lyceum_authz::RBACSystem;
use tracing::debug;

/// Health check handler
/// GET /api/v1/health
pub async fn health_check(rbac: &RBACSystem) -> ApiResult<Response<Full<Bytes>>> {
    debug!("Processing health check request");

    let health_response = HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        permissions: rbac.catalog().len(),
    };

    json_response(StatusCode::OK, &health_response)
}
