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

//! Data models for the REST API

use chrono::{DateTime, Utc};
use lyceum_authz::{NewRole, PermissionCatalog, PermissionId, PermissionKey, PermissionModule, Role, RoleAssignment, RoleId, RolePatch};
use serde::{Deserialize, Serialize};

// ====== Role Models ======

/// Create role request
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoleRequest {
    /// Display name
    pub name: String,

    /// Key, unique within the institute
    pub key: String,

    #[serde(default)]
    pub description: String,

    /// Catalog ids of the granted permissions
    #[serde(default)]
    pub permission_ids: Vec<PermissionId>,
}

impl CreateRoleRequest {
    pub fn into_new_role(self, catalog: &PermissionCatalog) -> NewRole {
        NewRole {
            permission_keys: catalog.keys_for_ids(&self.permission_ids),
            name: self.name,
            key: self.key,
            description: self.description,
        }
    }
}

/// Update role request; absent fields are left unchanged
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub key: Option<String>,
    pub permission_ids: Option<Vec<PermissionId>>,
    pub is_active: Option<bool>,

    /// Version the editor last read
    pub version: Option<u64>,
}

impl UpdateRoleRequest {
    pub fn into_patch(self, catalog: &PermissionCatalog) -> RolePatch {
        RolePatch {
            name: self.name,
            description: self.description,
            key: self.key,
            permission_keys: self.permission_ids.map(|ids| catalog.keys_for_ids(&ids)),
            is_active: self.is_active,
            expected_version: self.version,
        }
    }
}

/// Role as returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct RoleResponse {
    pub id: RoleId,
    pub name: String,
    pub key: String,
    pub description: String,

    /// Owning institute, `null` for platform roles
    pub institute_id: Option<String>,
    pub is_active: bool,
    pub is_system: bool,
    pub permission_ids: Vec<PermissionId>,
    pub permission_keys: Vec<PermissionKey>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoleResponse {
    pub fn from_role(role: Role, catalog: &PermissionCatalog) -> Self {
        let permission_ids = role.permission_keys.iter().filter_map(|key| catalog.get(key.as_str())).map(|permission| permission.id).collect();

        Self {
            id: role.id,
            name: role.name,
            key: role.key,
            description: role.description,
            institute_id: role.scope.into(),
            is_active: role.is_active,
            is_system: role.is_system,
            permission_ids,
            permission_keys: role.permission_keys.into_iter().collect(),
            version: role.version,
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }
}

/// Role list response
#[derive(Debug, Serialize, Deserialize)]
pub struct RoleListResponse {
    pub roles: Vec<RoleResponse>,
    pub total: usize,
}

// ====== Permission Models ======

/// Grouped permission catalog
#[derive(Debug, Serialize, Deserialize)]
pub struct PermissionsResponse {
    pub modules: Vec<PermissionModule>,
}

/// Caller's effective permissions in the session scope
#[derive(Debug, Serialize, Deserialize)]
pub struct MyPermissionsResponse {
    pub permission_keys: Vec<PermissionKey>,
    pub role_name: Option<String>,
    pub full_access: bool,
}

// ====== Assignment Models ======

/// Assign role request
#[derive(Debug, Serialize, Deserialize)]
pub struct AssignRoleRequest {
    pub role_id: RoleId,

    /// Version of the assignment being replaced; when present a concurrent
    /// change fails with `concurrent_modification`
    #[serde(default)]
    pub version: Option<u64>,
}

/// Assignment as returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct AssignmentResponse {
    pub actor_id: String,
    pub institute_id: Option<String>,
    pub role_id: RoleId,
    pub version: u64,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: String,
}

impl From<RoleAssignment> for AssignmentResponse {
    fn from(assignment: RoleAssignment) -> Self {
        Self {
            actor_id: assignment.actor_id.to_string(),
            institute_id: assignment.scope.into(),
            role_id: assignment.role_id,
            version: assignment.version,
            assigned_at: assignment.assigned_at,
            assigned_by: assignment.assigned_by.to_string(),
        }
    }
}

// ====== System Models ======

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status
    pub status: String,

    pub timestamp: DateTime<Utc>,

    pub version: String,

    /// Number of permissions in the loaded catalog
    pub permissions: usize,
}
