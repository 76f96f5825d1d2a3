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

//! Request handlers for the REST API

pub mod assignments;
pub mod health;
pub mod permissions;
pub mod roles;

use crate::error::{ApiError, ApiResult};
use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Serialize `value` as a JSON response
pub(crate) fn json_response<T: Serialize>(status: StatusCode, value: &T) -> ApiResult<Response<Full<Bytes>>> {
    let response_json = serde_json::to_string(value)?;

    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(response_json)))?)
}

pub(crate) fn no_content() -> ApiResult<Response<Full<Bytes>>> {
    Ok(Response::builder().status(StatusCode::NO_CONTENT).body(Full::new(Bytes::new()))?)
}

/// Parse a JSON request body
pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    if body.is_empty() {
        return Err(ApiError::BadRequest {
            message: "Request body is required".to_string(),
        });
    }
    Ok(serde_json::from_slice(body)?)
}
