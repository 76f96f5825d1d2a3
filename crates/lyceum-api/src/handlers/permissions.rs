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

//! Permission catalog and "my permissions" handlers

use super::json_response;
use crate::auth::Claims;
use crate::error::ApiResult;
use crate::models::{MyPermissionsResponse, PermissionsResponse};
use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use lyceum_authz::{AuthzError, MyPermissions, RBACSystem};
use std::collections::BTreeSet;

/// Grouped permission catalog
/// GET /api/v1/rbac/permissions
pub async fn list_permissions(rbac: &RBACSystem) -> ApiResult<Response<Full<Bytes>>> {
    let response = PermissionsResponse {
        modules: rbac.list_permission_modules().to_vec(),
    };

    json_response(StatusCode::OK, &response)
}

/// Caller's permissions in the session scope.
/// An actor without a role here gets an empty set rather than an error.
/// GET /api/v1/rbac/me/permissions
pub async fn my_permissions(rbac: &RBACSystem, claims: &Claims) -> ApiResult<Response<Full<Bytes>>> {
    let mine = match rbac.my_permissions(&claims.actor_id(), &claims.scope()?).await {
        Ok(mine) => mine,
        Err(AuthzError::NoAssignment { .. }) => MyPermissions {
            permission_keys: BTreeSet::new(),
            role_name: None,
            full_access: false,
        },
        Err(e) => return Err(e.into()),
    };

    let response = MyPermissionsResponse {
        permission_keys: mine.permission_keys.into_iter().collect(),
        role_name: mine.role_name,
        full_access: mine.full_access,
    };

    json_response(StatusCode::OK, &response)
}
