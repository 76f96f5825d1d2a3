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

//! Role management handlers

use super::{json_response, no_content, parse_json};
use crate::auth::Claims;
use crate::error::{ApiError, ApiResult};
use crate::models::{CreateRoleRequest, RoleListResponse, RoleResponse, UpdateRoleRequest};
use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use lyceum_authz::catalog::keys;
use lyceum_authz::{RBACSystem, RoleId};
use tracing::info;

/// Parse a role id from the path.
///
/// A malformed id is reported as not found, but only to callers who pass the
/// management gate; everyone else gets the usual `Forbidden`.
async fn parse_role_id(rbac: &RBACSystem, claims: &Claims, raw: &str) -> ApiResult<RoleId> {
    match raw.parse::<RoleId>() {
        Ok(role_id) => Ok(role_id),
        Err(e) => {
            rbac.require(&claims.actor_id(), &claims.scope()?, keys::ROLES_MANAGE).await?;
            Err(e.into())
        }
    }
}

/// Parse `version=N` out of a query string
pub(crate) fn version_from_query(query: Option<&str>) -> ApiResult<Option<u64>> {
    let Some(query) = query else {
        return Ok(None);
    };

    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("version=") {
            return value.parse::<u64>().map(Some).map_err(|_| ApiError::BadRequest {
                message: format!("Invalid version '{}'", value),
            });
        }
    }
    Ok(None)
}

/// List roles visible in the caller's scope
/// GET /api/v1/rbac/roles
pub async fn list_roles(rbac: &RBACSystem, claims: &Claims) -> ApiResult<Response<Full<Bytes>>> {
    let roles = rbac.list_roles(&claims.actor_id(), &claims.scope()?).await?;

    let roles: Vec<RoleResponse> = roles.into_iter().map(|role| RoleResponse::from_role(role, rbac.catalog())).collect();
    let total = roles.len();

    json_response(StatusCode::OK, &RoleListResponse { roles, total })
}

/// Create a role in the caller's scope
/// POST /api/v1/rbac/roles
pub async fn create_role(rbac: &RBACSystem, claims: &Claims, body: &Bytes) -> ApiResult<Response<Full<Bytes>>> {
    let request: CreateRoleRequest = parse_json(body)?;
    info!(actor_id = %claims.sub, key = %request.key, "Processing create role request");

    let new_role = request.into_new_role(rbac.catalog());
    let role = rbac.create_role(&claims.actor_id(), &claims.scope()?, new_role).await?;

    json_response(StatusCode::CREATED, &RoleResponse::from_role(role, rbac.catalog()))
}

/// Update a role
/// PUT /api/v1/rbac/roles/{id}
pub async fn update_role(rbac: &RBACSystem, claims: &Claims, role_id: &str, body: &Bytes) -> ApiResult<Response<Full<Bytes>>> {
    let request: UpdateRoleRequest = parse_json(body)?;
    let role_id = parse_role_id(rbac, claims, role_id).await?;
    info!(actor_id = %claims.sub, role_id = %role_id, "Processing update role request");

    let patch = request.into_patch(rbac.catalog());
    let role = rbac.update_role(&claims.actor_id(), &claims.scope()?, role_id, patch).await?;

    json_response(StatusCode::OK, &RoleResponse::from_role(role, rbac.catalog()))
}

/// Delete a role, optionally guarded by `?version=N`
/// DELETE /api/v1/rbac/roles/{id}
pub async fn delete_role(rbac: &RBACSystem, claims: &Claims, role_id: &str, query: Option<&str>) -> ApiResult<Response<Full<Bytes>>> {
    let expected_version = version_from_query(query)?;
    let role_id = parse_role_id(rbac, claims, role_id).await?;
    info!(actor_id = %claims.sub, role_id = %role_id, "Processing delete role request");

    rbac.delete_role(&claims.actor_id(), &claims.scope()?, role_id, expected_version).await?;

    no_content()
}
