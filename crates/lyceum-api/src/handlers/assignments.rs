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

//! Role assignment handlers

use super::{json_response, no_content, parse_json};
use crate::auth::Claims;
use crate::error::ApiResult;
use crate::models::{AssignRoleRequest, AssignmentResponse};
use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use lyceum_authz::{ActorId, RBACSystem};
use tracing::info;

/// Set the role of `actor_id` in the caller's scope
/// PUT /api/v1/rbac/assignments/{actor_id}
pub async fn assign_role(rbac: &RBACSystem, claims: &Claims, actor_id: &str, body: &Bytes) -> ApiResult<Response<Full<Bytes>>> {
    let request: AssignRoleRequest = parse_json(body)?;
    info!(actor_id = %claims.sub, target = %actor_id, role_id = %request.role_id, "Processing assign role request");

    let target = ActorId::from(actor_id);
    let assignment = match request.version {
        Some(version) => rbac.reassign_role(&claims.actor_id(), &claims.scope()?, &target, request.role_id, version).await?,
        None => rbac.assign_role(&claims.actor_id(), &claims.scope()?, &target, request.role_id).await?,
    };

    json_response(StatusCode::OK, &AssignmentResponse::from(assignment))
}

/// Remove the role of `actor_id` in the caller's scope
/// DELETE /api/v1/rbac/assignments/{actor_id}
pub async fn unassign_role(rbac: &RBACSystem, claims: &Claims, actor_id: &str) -> ApiResult<Response<Full<Bytes>>> {
    info!(actor_id = %claims.sub, target = %actor_id, "Processing unassign role request");

    let target = ActorId::from(actor_id);
    rbac.unassign_role(&claims.actor_id(), &claims.scope()?, &target).await?;

    no_content()
}
