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

//! Persistence seam for roles and role assignments
//!
//! Every write that must be atomic with a check lives here, behind one
//! repository call:
//!
//! 1. **Insert**: key uniqueness check and insert
//! 2. **Replace**: compare-and-swap on the role version
//! 3. **Delete**: system-role and in-use checks and removal
//! 4. **Assign**: role existence/visibility check and upsert
//! 5. **Seed**: insert or realign a platform system role with its definition
//!
//! Versions start at 1 and increase by one on every successful write.

use crate::assignments::RoleAssignment;
use crate::error::{AuthzError, AuthzResult};
use crate::roles::{Role, RoleId};
use crate::scope::{ActorId, Scope};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Storage backend for the RBAC engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RbacRepository: Send + Sync {
    /// Roles owned by `scope` plus every platform-wide role
    async fn list_roles(&self, scope: &Scope) -> AuthzResult<Vec<Role>>;

    async fn get_role(&self, role_id: RoleId) -> AuthzResult<Option<Role>>;

    /// Insert a new role; `DuplicateKey` if its key collides within its scope or with a platform role
    async fn insert_role(&self, role: Role) -> AuthzResult<Role>;

    /// Replace a role if its stored version still equals `expected_version`
    async fn replace_role(&self, role: Role, expected_version: u64) -> AuthzResult<Role>;

    /// Store a system role definition: insert it when its key is unknown,
    /// otherwise bring the stored permission set in line with it. Names and
    /// descriptions edited by operators are kept.
    async fn sync_system_role(&self, role: Role) -> AuthzResult<SystemRoleSync>;

    /// Remove a role unless it is a system role or still assigned
    async fn delete_role(&self, role_id: RoleId, expected_version: Option<u64>) -> AuthzResult<Role>;

    async fn get_assignment(&self, actor_id: &ActorId, scope: &Scope) -> AuthzResult<Option<RoleAssignment>>;

    /// Create or replace the single assignment of `(actor, scope)`
    async fn upsert_assignment(&self, assignment: RoleAssignment, expected_version: Option<u64>) -> AuthzResult<RoleAssignment>;

    async fn remove_assignment(&self, actor_id: &ActorId, scope: &Scope) -> AuthzResult<Option<RoleAssignment>>;

    /// Drop every assignment held by an actor, returning how many were removed
    async fn remove_actor(&self, actor_id: &ActorId) -> AuthzResult<usize>;

    async fn count_assignments(&self, role_id: RoleId) -> AuthzResult<usize>;

    /// Assignment and its role read from one consistent snapshot
    async fn resolve(&self, actor_id: &ActorId, scope: &Scope) -> AuthzResult<Option<(RoleAssignment, Option<Role>)>>;
}

/// Outcome of [`RbacRepository::sync_system_role`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemRoleSync {
    Inserted,
    Updated,
    Unchanged,
}

#[derive(Debug, Default)]
struct Tables {
    roles: HashMap<RoleId, Role>,
    assignments: HashMap<(ActorId, Scope), RoleAssignment>,
}

impl Tables {
    /// A platform key collides with any role; an institute key with its own scope and the platform
    fn key_taken(&self, key: &str, scope: &Scope, except: Option<RoleId>) -> bool {
        self.roles
            .values()
            .any(|role| Some(role.id) != except && role.key == key && (scope.is_platform() || role.scope.is_platform() || role.scope == *scope))
    }

    fn assignment_count(&self, role_id: RoleId) -> usize {
        self.assignments.values().filter(|a| a.role_id == role_id).count()
    }
}

fn check_version(entity: String, expected: u64, actual: u64) -> AuthzResult<()> {
    if expected != actual {
        return Err(AuthzError::ConcurrentModification { entity, expected, actual });
    }
    Ok(())
}

/// In-memory repository: one table set behind a single async read-write lock
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored roles
    pub async fn role_count(&self) -> usize {
        self.tables.read().await.roles.len()
    }
}

#[async_trait]
impl RbacRepository for MemoryRepository {
    async fn list_roles(&self, scope: &Scope) -> AuthzResult<Vec<Role>> {
        let tables = self.tables.read().await;
        Ok(tables.roles.values().filter(|role| scope.can_see(&role.scope)).cloned().collect())
    }

    async fn get_role(&self, role_id: RoleId) -> AuthzResult<Option<Role>> {
        Ok(self.tables.read().await.roles.get(&role_id).cloned())
    }

    async fn insert_role(&self, mut role: Role) -> AuthzResult<Role> {
        let mut tables = self.tables.write().await;

        if tables.key_taken(&role.key, &role.scope, None) {
            return Err(AuthzError::DuplicateKey {
                key: role.key,
                scope: role.scope,
            });
        }

        role.version = 1;
        tables.roles.insert(role.id, role.clone());

        debug!(role_id = %role.id, key = %role.key, scope = %role.scope, "Role inserted");
        Ok(role)
    }

    async fn replace_role(&self, mut role: Role, expected_version: u64) -> AuthzResult<Role> {
        let mut tables = self.tables.write().await;

        let current = tables.roles.get(&role.id).ok_or_else(|| AuthzError::role_not_found(role.id))?;
        check_version(format!("role {}", role.id), expected_version, current.version)?;

        if current.is_system && (current.key != role.key || current.permission_keys != role.permission_keys || !role.is_system) {
            return Err(AuthzError::SystemRoleImmutable {
                role_id: role.id,
                message: "key and permissions of a system role cannot change".to_string(),
            });
        }

        if current.key != role.key && tables.key_taken(&role.key, &role.scope, Some(role.id)) {
            return Err(AuthzError::DuplicateKey {
                key: role.key,
                scope: role.scope,
            });
        }

        role.version = current.version + 1;
        role.created_at = current.created_at;
        role.scope = current.scope.clone();
        tables.roles.insert(role.id, role.clone());

        debug!(role_id = %role.id, version = role.version, "Role replaced");
        Ok(role)
    }

    async fn sync_system_role(&self, mut role: Role) -> AuthzResult<SystemRoleSync> {
        let mut tables = self.tables.write().await;

        let existing = tables.roles.values_mut().find(|stored| stored.is_system && stored.scope.is_platform() && stored.key == role.key);

        if let Some(stored) = existing {
            if stored.permission_keys == role.permission_keys {
                return Ok(SystemRoleSync::Unchanged);
            }

            stored.permission_keys = role.permission_keys;
            stored.version += 1;
            stored.updated_at = role.updated_at;

            debug!(role_id = %stored.id, key = %stored.key, version = stored.version, "System role realigned");
            return Ok(SystemRoleSync::Updated);
        }

        if tables.key_taken(&role.key, &Scope::Platform, None) {
            return Err(AuthzError::DuplicateKey { key: role.key, scope: role.scope });
        }

        role.version = 1;
        debug!(role_id = %role.id, key = %role.key, "System role inserted");
        tables.roles.insert(role.id, role);
        Ok(SystemRoleSync::Inserted)
    }

    async fn delete_role(&self, role_id: RoleId, expected_version: Option<u64>) -> AuthzResult<Role> {
        let mut tables = self.tables.write().await;

        let current = tables.roles.get(&role_id).ok_or_else(|| AuthzError::role_not_found(role_id))?;

        if current.is_system {
            return Err(AuthzError::SystemRoleImmutable {
                role_id,
                message: "system roles cannot be deleted".to_string(),
            });
        }

        if let Some(expected) = expected_version {
            check_version(format!("role {}", role_id), expected, current.version)?;
        }

        let assignments = tables.assignment_count(role_id);
        if assignments > 0 {
            return Err(AuthzError::RoleInUse { role_id, assignments });
        }

        let removed = tables.roles.remove(&role_id).ok_or_else(|| AuthzError::role_not_found(role_id))?;

        debug!(role_id = %role_id, "Role removed");
        Ok(removed)
    }

    async fn get_assignment(&self, actor_id: &ActorId, scope: &Scope) -> AuthzResult<Option<RoleAssignment>> {
        let tables = self.tables.read().await;
        Ok(tables.assignments.get(&(actor_id.clone(), scope.clone())).cloned())
    }

    async fn upsert_assignment(&self, mut assignment: RoleAssignment, expected_version: Option<u64>) -> AuthzResult<RoleAssignment> {
        let mut tables = self.tables.write().await;

        let role = tables.roles.get(&assignment.role_id).ok_or_else(|| AuthzError::role_not_found(assignment.role_id))?;

        if !assignment.scope.can_see(&role.scope) {
            return Err(AuthzError::role_not_found(assignment.role_id));
        }

        if !role.is_active {
            return Err(AuthzError::InvalidRole {
                message: format!("role '{}' is inactive and cannot be assigned", role.key),
            });
        }

        let slot = (assignment.actor_id.clone(), assignment.scope.clone());
        let current_version = tables.assignments.get(&slot).map(|a| a.version).unwrap_or(0);

        if let Some(expected) = expected_version {
            check_version(format!("assignment of {} in {}", assignment.actor_id, assignment.scope), expected, current_version)?;
        }

        assignment.version = current_version + 1;
        tables.assignments.insert(slot, assignment.clone());

        debug!(actor_id = %assignment.actor_id, scope = %assignment.scope, role_id = %assignment.role_id, version = assignment.version, "Assignment stored");
        Ok(assignment)
    }

    async fn remove_assignment(&self, actor_id: &ActorId, scope: &Scope) -> AuthzResult<Option<RoleAssignment>> {
        let mut tables = self.tables.write().await;
        Ok(tables.assignments.remove(&(actor_id.clone(), scope.clone())))
    }

    async fn remove_actor(&self, actor_id: &ActorId) -> AuthzResult<usize> {
        let mut tables = self.tables.write().await;
        let before = tables.assignments.len();
        tables.assignments.retain(|(actor, _), _| actor != actor_id);
        Ok(before - tables.assignments.len())
    }

    async fn count_assignments(&self, role_id: RoleId) -> AuthzResult<usize> {
        Ok(self.tables.read().await.assignment_count(role_id))
    }

    async fn resolve(&self, actor_id: &ActorId, scope: &Scope) -> AuthzResult<Option<(RoleAssignment, Option<Role>)>> {
        let tables = self.tables.read().await;

        Ok(tables
            .assignments
            .get(&(actor_id.clone(), scope.clone()))
            .map(|assignment| (assignment.clone(), tables.roles.get(&assignment.role_id).cloned())))
    }
}
