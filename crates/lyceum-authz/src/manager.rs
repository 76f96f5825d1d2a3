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

//! Role management

use crate::catalog::{PermissionCatalog, PermissionKey};
use crate::error::{AuthzError, AuthzResult};
use crate::roles::{NewRole, Role, RoleId, RolePatch, create_default_roles, validate_role_key, validate_role_name};
use crate::scope::Scope;
use crate::storage::{RbacRepository, SystemRoleSync};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Role manager for handling role operations
#[derive(Clone)]
pub struct RoleManager {
    catalog: Arc<PermissionCatalog>,
    repository: Arc<dyn RbacRepository>,
}

impl RoleManager {
    pub fn new(catalog: Arc<PermissionCatalog>, repository: Arc<dyn RbacRepository>) -> Self {
        Self { catalog, repository }
    }

    /// Insert missing platform system roles and realign stored ones with the
    /// current catalog. Safe to call on every start; returns how many changed.
    pub async fn seed_system_roles(&self) -> AuthzResult<usize> {
        let mut inserted = 0;
        let mut updated = 0;

        for role in create_default_roles(&self.catalog) {
            match self.repository.sync_system_role(role).await? {
                SystemRoleSync::Inserted => inserted += 1,
                SystemRoleSync::Updated => updated += 1,
                SystemRoleSync::Unchanged => {}
            }
        }

        info!(inserted, updated, "System roles seeded");
        Ok(inserted + updated)
    }

    /// Roles visible in `scope`: system roles first, then by name
    pub async fn list_roles(&self, scope: &Scope) -> AuthzResult<Vec<Role>> {
        let mut roles = self.repository.list_roles(scope).await?;
        roles.sort_by(|a, b| b.is_system.cmp(&a.is_system).then_with(|| a.name.cmp(&b.name)).then_with(|| a.key.cmp(&b.key)));
        Ok(roles)
    }

    pub async fn get_role(&self, role_id: RoleId) -> AuthzResult<Role> {
        self.repository.get_role(role_id).await?.ok_or_else(|| AuthzError::role_not_found(role_id))
    }

    /// Create a custom role owned by `scope`
    pub async fn create_role(&self, scope: &Scope, new_role: NewRole) -> AuthzResult<Role> {
        validate_role_name(&new_role.name)?;
        validate_role_key(&new_role.key)?;
        self.validate_permission_set(&new_role.permission_keys)?;

        let role = self.repository.insert_role(Role::new(scope.clone(), new_role)).await?;

        info!(role_id = %role.id, key = %role.key, scope = %scope, "Role created");
        Ok(role)
    }

    /// Apply a partial update. System roles accept name and description changes only.
    pub async fn update_role(&self, role_id: RoleId, patch: RolePatch) -> AuthzResult<Role> {
        let current = self.get_role(role_id).await?;

        match patch.expected_version {
            Some(expected) if expected != current.version => {
                return Err(AuthzError::ConcurrentModification {
                    entity: format!("role {}", role_id),
                    expected,
                    actual: current.version,
                });
            }
            _ => {}
        }

        if current.is_system {
            let changes = patch.protected_changes(&current);
            if !changes.is_empty() {
                return Err(AuthzError::SystemRoleImmutable {
                    role_id,
                    message: format!("cannot change {}", changes.join(", ")),
                });
            }
        }

        let mut updated = current.clone();

        if let Some(name) = &patch.name {
            validate_role_name(name)?;
            updated.name = name.trim().to_string();
        }
        if let Some(description) = &patch.description {
            updated.description = description.trim().to_string();
        }
        if let Some(key) = &patch.key {
            validate_role_key(key)?;
            updated.key = key.trim().to_string();
        }
        if let Some(permission_keys) = patch.permission_keys {
            self.validate_permission_set(&permission_keys)?;
            updated.permission_keys = permission_keys;
        }
        if let Some(is_active) = patch.is_active {
            updated.is_active = is_active;
        }

        updated.updated_at = Utc::now();

        let expected_version = patch.expected_version.unwrap_or(current.version);
        let role = self.repository.replace_role(updated, expected_version).await?;

        debug!(role_id = %role.id, version = role.version, "Role updated");
        Ok(role)
    }

    /// Delete a custom role that no actor holds
    pub async fn delete_role(&self, role_id: RoleId, expected_version: Option<u64>) -> AuthzResult<Role> {
        let role = self.repository.delete_role(role_id, expected_version).await?;

        info!(role_id = %role_id, key = %role.key, "Role deleted");
        Ok(role)
    }

    fn validate_permission_set(&self, permission_keys: &BTreeSet<PermissionKey>) -> AuthzResult<()> {
        if permission_keys.is_empty() {
            return Err(AuthzError::EmptyPermissionSet);
        }
        self.catalog.validate_keys(permission_keys.iter())
    }
}
