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

//! Platform-level roles that bypass role-based permission checks

use crate::error::AuthzResult;
use crate::scope::{ActorId, InstituteId, Scope};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Role an account holds outside any institute role assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlatformRole {
    /// Operator of the whole platform
    SuperAdmin,
    /// Owner of a single institute
    InstituteOwner { institute: InstituteId },
    /// Ordinary account; access comes from role assignments only
    Member,
}

impl PlatformRole {
    pub fn grants_full_access(&self, scope: &Scope) -> bool {
        match self {
            PlatformRole::SuperAdmin => true,
            PlatformRole::InstituteOwner { institute } => scope.institute_id() == Some(institute),
            PlatformRole::Member => false,
        }
    }
}

/// Source of platform roles, usually backed by the account service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformDirectory: Send + Sync {
    async fn platform_role(&self, actor_id: &ActorId) -> AuthzResult<Option<PlatformRole>>;

    /// Full access short-circuits every permission check in `scope`
    async fn has_full_access(&self, actor_id: &ActorId, scope: &Scope) -> AuthzResult<bool> {
        Ok(self.platform_role(actor_id).await?.is_some_and(|role| role.grants_full_access(scope)))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPlatformDirectory {
    roles: DashMap<ActorId, PlatformRole>,
}

impl InMemoryPlatformDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_superadmins<I, A>(actors: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<ActorId>,
    {
        let directory = Self::new();
        for actor in actors {
            directory.set_role(actor.into(), PlatformRole::SuperAdmin);
        }
        directory
    }

    pub fn set_role(&self, actor_id: ActorId, role: PlatformRole) {
        self.roles.insert(actor_id, role);
    }

    pub fn remove(&self, actor_id: &ActorId) -> Option<PlatformRole> {
        self.roles.remove(actor_id).map(|(_, role)| role)
    }
}

#[async_trait]
impl PlatformDirectory for InMemoryPlatformDirectory {
    async fn platform_role(&self, actor_id: &ActorId) -> AuthzResult<Option<PlatformRole>> {
        Ok(self.roles.get(actor_id).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_access_rules() {
        let owner = PlatformRole::InstituteOwner { institute: InstituteId::from("s1") };

        assert!(owner.grants_full_access(&Scope::institute("s1")));
        assert!(!owner.grants_full_access(&Scope::institute("s2")));
        assert!(!owner.grants_full_access(&Scope::Platform));
        assert!(PlatformRole::SuperAdmin.grants_full_access(&Scope::institute("s2")));
        assert!(PlatformRole::SuperAdmin.grants_full_access(&Scope::Platform));
        assert!(!PlatformRole::Member.grants_full_access(&Scope::institute("s1")));
    }

    #[tokio::test]
    async fn test_in_memory_directory() {
        let directory = InMemoryPlatformDirectory::with_superadmins(["root"]);
        directory.set_role(ActorId::from("owner"), PlatformRole::InstituteOwner { institute: InstituteId::from("s1") });

        assert!(directory.has_full_access(&ActorId::from("root"), &Scope::institute("s9")).await.unwrap());
        assert!(directory.has_full_access(&ActorId::from("owner"), &Scope::institute("s1")).await.unwrap());
        assert!(!directory.has_full_access(&ActorId::from("owner"), &Scope::institute("s2")).await.unwrap());
        assert!(!directory.has_full_access(&ActorId::from("nobody"), &Scope::institute("s1")).await.unwrap());

        assert_eq!(directory.remove(&ActorId::from("root")), Some(PlatformRole::SuperAdmin));
        assert!(!directory.has_full_access(&ActorId::from("root"), &Scope::institute("s9")).await.unwrap());
    }
}
