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

//! Access query facade that coordinates all RBAC components
//!
//! Every protected operation in the application asks this facade. Decisions
//! fail closed: when the actor's access cannot be resolved, the answer is deny.

use crate::assignments::{AssignmentManager, RoleAssignment};
use crate::audit::AuditLogger;
use crate::catalog::{PermissionCatalog, PermissionKey, PermissionModule, keys};
use crate::config::RbacConfig;
use crate::error::{AuthzError, AuthzResult};
use crate::evaluator::{EffectivePermissions, Requirement};
use crate::manager::RoleManager;
use crate::platform::PlatformDirectory;
use crate::roles::{NewRole, Role, RoleId, RolePatch};
use crate::scope::{ActorId, Scope};
use crate::storage::RbacRepository;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Everything an actor is entitled to within one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorAccess {
    pub permission_keys: BTreeSet<PermissionKey>,
    pub role: Option<Role>,
    pub full_access: bool,
}

impl ActorAccess {
    pub fn effective(&self) -> EffectivePermissions {
        EffectivePermissions::new(self.permission_keys.clone(), self.full_access)
    }
}

/// Caller-facing summary returned by the "my permissions" query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyPermissions {
    pub permission_keys: BTreeSet<PermissionKey>,
    pub role_name: Option<String>,
    pub full_access: bool,
}

impl From<ActorAccess> for MyPermissions {
    fn from(access: ActorAccess) -> Self {
        Self {
            permission_keys: access.permission_keys,
            role_name: access.role.map(|role| role.name),
            full_access: access.full_access,
        }
    }
}

/// Main RBAC system
#[derive(Clone)]
pub struct RBACSystem {
    catalog: Arc<PermissionCatalog>,
    roles: RoleManager,
    assignments: AssignmentManager,
    directory: Arc<dyn PlatformDirectory>,
    audit_logger: Arc<AuditLogger>,
    config: RbacConfig,
}

impl fmt::Debug for RBACSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RBACSystem")
            .field("permission_count", &self.catalog.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RBACSystem {
    pub fn new(config: RbacConfig, catalog: Arc<PermissionCatalog>, repository: Arc<dyn RbacRepository>, directory: Arc<dyn PlatformDirectory>) -> Self {
        Self {
            roles: RoleManager::new(catalog.clone(), repository.clone()),
            assignments: AssignmentManager::new(repository),
            audit_logger: Arc::new(AuditLogger::with_max_events(config.audit_capacity)),
            catalog,
            directory,
            config,
        }
    }

    /// Load the permission catalog and seed system roles as configured
    pub async fn initialize(config: RbacConfig, repository: Arc<dyn RbacRepository>, directory: Arc<dyn PlatformDirectory>) -> AuthzResult<Self> {
        let catalog = Arc::new(PermissionCatalog::load(&config)?);
        let system = Self::new(config, catalog, repository, directory);

        if system.config.seed_system_roles {
            system.roles.seed_system_roles().await?;
        }

        info!(permission_count = system.catalog.len(), "RBAC system initialized successfully");
        Ok(system)
    }

    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    pub fn role_manager(&self) -> &RoleManager {
        &self.roles
    }

    pub fn assignment_manager(&self) -> &AssignmentManager {
        &self.assignments
    }

    pub fn audit_logger(&self) -> &AuditLogger {
        &self.audit_logger
    }

    /// Resolve the actor's permission keys, role and full-access flag in `scope`
    pub async fn resolve_actor_access(&self, actor_id: &ActorId, scope: &Scope) -> AuthzResult<ActorAccess> {
        let full_access = self.directory.has_full_access(actor_id, scope).await?;

        match self.assignments.resolve(actor_id, scope).await? {
            Some((_, Some(role))) => Ok(ActorAccess {
                permission_keys: role.effective_keys(),
                role: Some(role),
                full_access,
            }),
            Some((assignment, None)) => {
                warn!(actor_id = %actor_id, scope = %scope, role_id = %assignment.role_id, "Assignment points at a missing role");
                self.unassigned_access(actor_id, scope, full_access)
            }
            None => self.unassigned_access(actor_id, scope, full_access),
        }
    }

    fn unassigned_access(&self, actor_id: &ActorId, scope: &Scope, full_access: bool) -> AuthzResult<ActorAccess> {
        if !full_access {
            return Err(AuthzError::NoAssignment {
                actor_id: actor_id.clone(),
                scope: scope.clone(),
            });
        }

        Ok(ActorAccess {
            permission_keys: BTreeSet::new(),
            role: None,
            full_access,
        })
    }

    /// AND check: every key of `requirement` must be held. Any resolution failure denies.
    pub async fn authorize(&self, actor_id: &ActorId, scope: &Scope, requirement: impl Into<Requirement>) -> bool {
        let requirement = requirement.into();
        self.decide(actor_id, scope, requirement.to_string(), |effective| effective.evaluate(&requirement))
            .await
            .unwrap_or(false)
    }

    /// OR check: at least one listed key must be held
    pub async fn authorize_any<K: AsRef<str>>(&self, actor_id: &ActorId, scope: &Scope, keys: &[K]) -> bool {
        self.decide(actor_id, scope, any_label(keys), |effective| effective.has_any_permission(keys)).await.unwrap_or(false)
    }

    /// Like [`authorize`](Self::authorize), but fails with `Forbidden` on deny.
    /// Storage faults are returned as they are, never as `Forbidden`.
    pub async fn require(&self, actor_id: &ActorId, scope: &Scope, requirement: impl Into<Requirement>) -> AuthzResult<()> {
        let requirement = requirement.into();
        let granted = self.decide(actor_id, scope, requirement.to_string(), |effective| effective.evaluate(&requirement)).await?;

        if !granted {
            return Err(AuthzError::Forbidden {
                message: format!("actor '{}' lacks {} in scope {}", actor_id, requirement, scope),
            });
        }
        Ok(())
    }

    /// OR form of [`require`](Self::require)
    pub async fn require_any<K: AsRef<str>>(&self, actor_id: &ActorId, scope: &Scope, keys: &[K]) -> AuthzResult<()> {
        let label = any_label(keys);
        let granted = self.decide(actor_id, scope, label.clone(), |effective| effective.has_any_permission(keys)).await?;

        if !granted {
            return Err(AuthzError::Forbidden {
                message: format!("actor '{}' lacks {} in scope {}", actor_id, label, scope),
            });
        }
        Ok(())
    }

    /// Evaluate one decision. Only internal faults come back as `Err`; every other failure is a deny.
    async fn decide<F>(&self, actor_id: &ActorId, scope: &Scope, label: String, check: F) -> AuthzResult<bool>
    where
        F: FnOnce(&EffectivePermissions) -> bool,
    {
        let start_time = Instant::now();

        let outcome = match self.resolve_actor_access(actor_id, scope).await {
            Ok(access) => Ok(check(&access.effective())),
            Err(e) if e.is_internal() => {
                error!(actor_id = %actor_id, scope = %scope, requirement = %label, error = %e, "Access resolution failed");
                Err(e)
            }
            Err(e) => {
                debug!(actor_id = %actor_id, scope = %scope, reason = %e, "Access resolution denied");
                Ok(false)
            }
        };

        let duration = start_time.elapsed();
        if duration > self.config.slow_check_threshold {
            warn!(
                actor_id = %actor_id,
                scope = %scope,
                requirement = %label,
                duration_ms = %duration.as_millis(),
                "Slow permission check detected"
            );
        }

        let granted = matches!(outcome, Ok(true));
        if granted {
            debug!(actor_id = %actor_id, scope = %scope, requirement = %label, duration_ms = %duration.as_millis(), "Access granted");
        } else {
            warn!(actor_id = %actor_id, scope = %scope, requirement = %label, "Access denied");
        }

        if self.config.access_audit.records(granted) {
            self.audit_logger.log_access(actor_id, scope, &label, granted).await;
        }
        outcome
    }

    pub async fn my_permissions(&self, actor_id: &ActorId, scope: &Scope) -> AuthzResult<MyPermissions> {
        self.resolve_actor_access(actor_id, scope).await.map(MyPermissions::from)
    }

    /// The permission catalog grouped by module
    pub fn list_permission_modules(&self) -> &[PermissionModule] {
        self.catalog.list_permissions()
    }

    /// Roles visible in `scope`. Requires `roles.view` or `roles.manage`.
    pub async fn list_roles(&self, caller: &ActorId, scope: &Scope) -> AuthzResult<Vec<Role>> {
        self.require_any(caller, scope, &[keys::ROLES_VIEW, keys::ROLES_MANAGE]).await?;
        self.roles.list_roles(scope).await
    }

    pub async fn create_role(&self, caller: &ActorId, scope: &Scope, new_role: NewRole) -> AuthzResult<Role> {
        let result: AuthzResult<Role> = async {
            self.require(caller, scope, keys::ROLES_MANAGE).await?;
            self.roles.create_role(scope, new_role).await
        }
        .await;

        let role = self.audited(caller, scope, "create_role", result).await?;
        self.audit_logger.log_role_created(caller, scope, role.id, &role.key).await;
        Ok(role)
    }

    pub async fn update_role(&self, caller: &ActorId, scope: &Scope, role_id: RoleId, patch: RolePatch) -> AuthzResult<Role> {
        let result: AuthzResult<Role> = async {
            self.require(caller, scope, keys::ROLES_MANAGE).await?;
            let current = self.visible_role(scope, role_id).await?;

            if current.is_system {
                let changes = patch.protected_changes(&current);
                if !changes.is_empty() {
                    return Err(AuthzError::SystemRoleImmutable {
                        role_id,
                        message: format!("cannot change {}", changes.join(", ")),
                    });
                }
            }

            self.ensure_owner(caller, scope, &current).await?;
            self.roles.update_role(role_id, patch).await
        }
        .await;

        let role = self.audited(caller, scope, "update_role", result).await?;
        self.audit_logger.log_role_updated(caller, scope, role.id, role.version).await;
        Ok(role)
    }

    pub async fn delete_role(&self, caller: &ActorId, scope: &Scope, role_id: RoleId, expected_version: Option<u64>) -> AuthzResult<Role> {
        let result: AuthzResult<Role> = async {
            self.require(caller, scope, keys::ROLES_MANAGE).await?;
            let current = self.visible_role(scope, role_id).await?;

            if current.is_system {
                return Err(AuthzError::SystemRoleImmutable {
                    role_id,
                    message: "system roles cannot be deleted".to_string(),
                });
            }

            self.ensure_owner(caller, scope, &current).await?;
            self.roles.delete_role(role_id, expected_version).await
        }
        .await;

        let role = self.audited(caller, scope, "delete_role", result).await?;
        self.audit_logger.log_role_deleted(caller, scope, role.id).await;
        Ok(role)
    }

    /// Give `target` the role `role_id` in `scope`, replacing any previous one
    pub async fn assign_role(&self, caller: &ActorId, scope: &Scope, target: &ActorId, role_id: RoleId) -> AuthzResult<RoleAssignment> {
        let result: AuthzResult<RoleAssignment> = async {
            self.require(caller, scope, keys::ROLES_MANAGE).await?;
            self.assignments.set_assignment(target, scope, role_id, caller).await
        }
        .await;

        self.record_assignment(caller, scope, target, result).await
    }

    /// Like [`assign_role`](Self::assign_role), but fails with `ConcurrentModification`
    /// unless the target's assignment is still at `expected_version` (0 for none).
    pub async fn reassign_role(&self, caller: &ActorId, scope: &Scope, target: &ActorId, role_id: RoleId, expected_version: u64) -> AuthzResult<RoleAssignment> {
        let result: AuthzResult<RoleAssignment> = async {
            self.require(caller, scope, keys::ROLES_MANAGE).await?;
            self.assignments.replace_assignment(target, scope, role_id, caller, expected_version).await
        }
        .await;

        self.record_assignment(caller, scope, target, result).await
    }

    async fn record_assignment(&self, caller: &ActorId, scope: &Scope, target: &ActorId, result: AuthzResult<RoleAssignment>) -> AuthzResult<RoleAssignment> {
        let assignment = self.audited(caller, scope, "assign_role", result).await?;
        self.audit_logger.log_role_assigned(caller, scope, target, assignment.role_id).await;
        Ok(assignment)
    }

    pub async fn unassign_role(&self, caller: &ActorId, scope: &Scope, target: &ActorId) -> AuthzResult<RoleAssignment> {
        let result: AuthzResult<RoleAssignment> = async {
            self.require(caller, scope, keys::ROLES_MANAGE).await?;
            self.assignments.remove_assignment(target, scope).await
        }
        .await;

        let removed = self.audited(caller, scope, "unassign_role", result).await?;
        self.audit_logger.log_role_unassigned(caller, scope, target, removed.role_id).await;
        Ok(removed)
    }

    /// Drop every assignment of a deleted account. Platform operators only.
    pub async fn remove_actor(&self, caller: &ActorId, target: &ActorId) -> AuthzResult<usize> {
        let scope = Scope::Platform;
        let result: AuthzResult<usize> = async {
            self.require(caller, &scope, keys::ROLES_MANAGE).await?;
            self.assignments.remove_actor(target).await
        }
        .await;

        let removed = self.audited(caller, &scope, "remove_actor", result).await?;
        self.audit_logger.log_actor_removed(caller, &scope, target, removed).await;
        Ok(removed)
    }

    /// Roles owned by another institute are reported as missing
    async fn visible_role(&self, scope: &Scope, role_id: RoleId) -> AuthzResult<Role> {
        let role = self.roles.get_role(role_id).await?;
        if !scope.can_see(&role.scope) {
            return Err(AuthzError::role_not_found(role_id));
        }
        Ok(role)
    }

    /// Platform-owned roles can only be changed by callers with platform-wide full access
    async fn ensure_owner(&self, caller: &ActorId, scope: &Scope, role: &Role) -> AuthzResult<()> {
        if role.scope == *scope || self.directory.has_full_access(caller, &Scope::Platform).await? {
            return Ok(());
        }

        Err(AuthzError::Forbidden {
            message: format!("role {} belongs to scope {}", role.id, role.scope),
        })
    }

    async fn audited<T>(&self, caller: &ActorId, scope: &Scope, operation: &str, result: AuthzResult<T>) -> AuthzResult<T> {
        if let Err(e) = &result {
            if e.is_internal() {
                error!(actor_id = %caller, scope = %scope, operation, error = %e, "RBAC mutation failed");
            }
            self.audit_logger.log_mutation_rejected(caller, scope, operation, e.code()).await;
        }
        result
    }
}

fn any_label<K: AsRef<str>>(keys: &[K]) -> String {
    format!("any of [{}]", keys.iter().map(|k| k.as_ref()).collect::<Vec<_>>().join(", "))
}
