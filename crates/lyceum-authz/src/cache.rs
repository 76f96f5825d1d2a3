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

//! Client-side permission snapshot
//!
//! A [`ScopedPermissionCache`] belongs to one actor in one scope, the way a
//! UI session holds "my permissions" to decide what to render. The engine
//! never reads it: server-side checks always go through
//! [`RBACSystem::authorize`](crate::system::RBACSystem::authorize).

use crate::error::AuthzResult;
use crate::evaluator::{EffectivePermissions, Requirement};
use crate::scope::{ActorId, Scope};
use crate::system::{MyPermissions, RBACSystem};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Snapshot with expiration
#[derive(Debug, Clone)]
struct CacheEntry {
    value: MyPermissions,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() > at)
    }
}

/// Cache statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub refreshes: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        if self.hits + self.misses == 0 { 0.0 } else { self.hits as f64 / (self.hits + self.misses) as f64 }
    }
}

/// Cached "my permissions" view for one `(actor, scope)`
#[derive(Debug)]
pub struct ScopedPermissionCache {
    system: Arc<RBACSystem>,
    actor_id: ActorId,
    scope: Scope,
    ttl: Option<Duration>,
    entry: Mutex<Option<CacheEntry>>,
    stats: Mutex<CacheStats>,
}

impl ScopedPermissionCache {
    pub fn new(system: Arc<RBACSystem>, actor_id: ActorId, scope: Scope) -> Self {
        Self {
            system,
            actor_id,
            scope,
            ttl: None,
            entry: Mutex::new(None),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Expire the snapshot after `ttl`
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Cached snapshot, fetched on first use or after expiry
    pub async fn get(&self) -> AuthzResult<MyPermissions> {
        let cached = self.entry.lock().as_ref().filter(|entry| !entry.is_expired()).map(|entry| entry.value.clone());

        if let Some(value) = cached {
            self.stats.lock().hits += 1;
            return Ok(value);
        }

        self.stats.lock().misses += 1;
        self.fetch().await
    }

    /// Fetch a fresh snapshot regardless of the cached one
    pub async fn refresh(&self) -> AuthzResult<MyPermissions> {
        self.stats.lock().refreshes += 1;
        self.fetch().await
    }

    /// Drop the snapshot; the next `get` fetches again
    pub fn invalidate(&self) {
        *self.entry.lock() = None;
        debug!(actor_id = %self.actor_id, scope = %self.scope, "Permission snapshot invalidated");
    }

    pub async fn has_permission(&self, requirement: impl Into<Requirement>) -> AuthzResult<bool> {
        Ok(self.effective().await?.has_permission(requirement))
    }

    pub async fn has_any_permission<K: AsRef<str>>(&self, keys: &[K]) -> AuthzResult<bool> {
        Ok(self.effective().await?.has_any_permission(keys))
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    async fn effective(&self) -> AuthzResult<EffectivePermissions> {
        let snapshot = self.get().await?;
        Ok(EffectivePermissions::new(snapshot.permission_keys, snapshot.full_access))
    }

    async fn fetch(&self) -> AuthzResult<MyPermissions> {
        let value = self.system.my_permissions(&self.actor_id, &self.scope).await?;

        *self.entry.lock() = Some(CacheEntry {
            value: value.clone(),
            expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
        });

        debug!(actor_id = %self.actor_id, scope = %self.scope, permission_count = value.permission_keys.len(), "Permission snapshot cached");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::keys;
    use crate::config::RbacConfig;
    use crate::platform::InMemoryPlatformDirectory;
    use crate::roles::{NewRole, RolePatch};
    use crate::storage::MemoryRepository;

    async fn setup() -> (Arc<RBACSystem>, ActorId, Scope, crate::roles::Role) {
        let system = RBACSystem::initialize(RbacConfig::default(), Arc::new(MemoryRepository::new()), Arc::new(InMemoryPlatformDirectory::with_superadmins(["root"])))
            .await
            .unwrap();

        let root = ActorId::from("root");
        let actor = ActorId::from("a1");
        let scope = Scope::institute("s1");

        let role = system.create_role(&root, &scope, NewRole::new("Clerk", "clerk", [keys::DASHBOARD_VIEW])).await.unwrap();
        system.assign_role(&root, &scope, &actor, role.id).await.unwrap();

        (Arc::new(system), actor, scope, role)
    }

    #[tokio::test]
    async fn test_snapshot_hits_and_misses() {
        let (system, actor, scope, _) = setup().await;
        let cache = ScopedPermissionCache::new(system, actor, scope);

        assert!(cache.has_permission(keys::DASHBOARD_VIEW).await.unwrap());
        assert!(!cache.has_permission(keys::ROLES_MANAGE).await.unwrap());
        assert!(cache.has_any_permission(&[keys::ROLES_MANAGE, keys::DASHBOARD_VIEW]).await.unwrap());

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert!(stats.hit_ratio() > 0.5);
    }

    #[tokio::test]
    async fn test_snapshot_is_stale_until_refreshed() {
        let (system, actor, scope, role) = setup().await;
        let root = ActorId::from("root");
        let cache = ScopedPermissionCache::new(system.clone(), actor, scope.clone());

        assert!(!cache.has_permission(keys::EXAMS_VIEW).await.unwrap());

        system.update_role(&root, &scope, role.id, RolePatch::new().permissions([keys::DASHBOARD_VIEW, keys::EXAMS_VIEW])).await.unwrap();

        // Snapshot still reflects the old role
        assert!(!cache.has_permission(keys::EXAMS_VIEW).await.unwrap());

        cache.refresh().await.unwrap();
        assert!(cache.has_permission(keys::EXAMS_VIEW).await.unwrap());

        cache.invalidate();
        assert!(cache.has_permission(keys::EXAMS_VIEW).await.unwrap());
        assert_eq!(cache.stats().refreshes, 1);
    }

    #[tokio::test]
    async fn test_ttl_expires_snapshot() {
        let (system, actor, scope, _) = setup().await;
        let cache = ScopedPermissionCache::new(system, actor, scope).with_ttl(Duration::from_millis(1));

        cache.get().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.get().await.unwrap();

        assert_eq!(cache.stats().misses, 2);
    }

    #[tokio::test]
    async fn test_unassigned_actor_errors() {
        let (system, _, scope, _) = setup().await;
        let cache = ScopedPermissionCache::new(system, ActorId::from("stranger"), scope);

        assert!(cache.get().await.is_err());
        assert!(cache.has_permission(keys::DASHBOARD_VIEW).await.is_err());
    }
}
