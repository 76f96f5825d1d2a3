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

//! Actor to role assignments, one per actor and scope

use crate::error::{AuthzError, AuthzResult};
use crate::roles::{Role, RoleId};
use crate::scope::{ActorId, Scope};
use crate::storage::RbacRepository;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Binds an actor to exactly one role within a scope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleAssignment {
    pub actor_id: ActorId,
    pub scope: Scope,
    pub role_id: RoleId,

    /// Revision number, bumped on every reassignment
    pub version: u64,

    pub assigned_at: DateTime<Utc>,
    pub assigned_by: ActorId,
}

impl RoleAssignment {
    pub fn new(actor_id: ActorId, scope: Scope, role_id: RoleId, assigned_by: ActorId) -> Self {
        Self {
            actor_id,
            scope,
            role_id,
            version: 0,
            assigned_at: Utc::now(),
            assigned_by,
        }
    }
}

/// Manages role assignments
#[derive(Clone)]
pub struct AssignmentManager {
    repository: Arc<dyn RbacRepository>,
}

impl AssignmentManager {
    pub fn new(repository: Arc<dyn RbacRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_assignment(&self, actor_id: &ActorId, scope: &Scope) -> AuthzResult<Option<RoleAssignment>> {
        self.repository.get_assignment(actor_id, scope).await
    }

    /// Assign `role_id` to the actor, replacing any previous role in that scope
    pub async fn set_assignment(&self, actor_id: &ActorId, scope: &Scope, role_id: RoleId, assigned_by: &ActorId) -> AuthzResult<RoleAssignment> {
        self.store(actor_id, scope, role_id, assigned_by, None).await
    }

    /// Like [`set_assignment`](Self::set_assignment), but only if the current assignment is still at `expected_version`.
    /// Version 0 means "no assignment yet".
    pub async fn replace_assignment(&self, actor_id: &ActorId, scope: &Scope, role_id: RoleId, assigned_by: &ActorId, expected_version: u64) -> AuthzResult<RoleAssignment> {
        self.store(actor_id, scope, role_id, assigned_by, Some(expected_version)).await
    }

    async fn store(&self, actor_id: &ActorId, scope: &Scope, role_id: RoleId, assigned_by: &ActorId, expected_version: Option<u64>) -> AuthzResult<RoleAssignment> {
        let assignment = RoleAssignment::new(actor_id.clone(), scope.clone(), role_id, assigned_by.clone());
        let stored = self.repository.upsert_assignment(assignment, expected_version).await?;

        info!(actor_id = %actor_id, scope = %scope, role_id = %role_id, version = stored.version, "Role assigned");
        Ok(stored)
    }

    /// Remove the actor's assignment in `scope`
    pub async fn remove_assignment(&self, actor_id: &ActorId, scope: &Scope) -> AuthzResult<RoleAssignment> {
        let removed = self.repository.remove_assignment(actor_id, scope).await?.ok_or_else(|| AuthzError::NotFound {
            message: format!("Actor '{}' has no assignment in scope {}", actor_id, scope),
        })?;

        info!(actor_id = %actor_id, scope = %scope, role_id = %removed.role_id, "Role unassigned");
        Ok(removed)
    }

    /// Drop every assignment of a deleted actor
    pub async fn remove_actor(&self, actor_id: &ActorId) -> AuthzResult<usize> {
        let removed = self.repository.remove_actor(actor_id).await?;
        debug!(actor_id = %actor_id, removed, "Actor assignments removed");
        Ok(removed)
    }

    pub async fn count_for_role(&self, role_id: RoleId) -> AuthzResult<usize> {
        self.repository.count_assignments(role_id).await
    }

    /// The actor's assignment in `scope` together with the role it points at
    pub async fn resolve(&self, actor_id: &ActorId, scope: &Scope) -> AuthzResult<Option<(RoleAssignment, Option<Role>)>> {
        self.repository.resolve(actor_id, scope).await
    }
}
