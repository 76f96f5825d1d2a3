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

//! End-to-end authorization scenarios against the in-memory engine

use lyceum_authz::{
    ActorId, AuthzError, InMemoryPlatformDirectory, InstituteId, MemoryRepository, NewRole, PermissionCatalog, PermissionDefinition, PlatformRole, RBACSystem, RbacConfig, RolePatch,
    Scope,
};
use std::sync::Arc;

const DASHBOARD_VIEW: &str = "dashboard.view";
const STUDENTS_MANAGE: &str = "students.manage";
const ROLES_MANAGE: &str = "roles.manage";

fn small_catalog() -> Arc<PermissionCatalog> {
    Arc::new(
        PermissionCatalog::from_definitions(vec![
            PermissionDefinition::new("dashboard", DASHBOARD_VIEW, "View dashboard", ""),
            PermissionDefinition::new("students", STUDENTS_MANAGE, "Manage students", ""),
            PermissionDefinition::new("roles", ROLES_MANAGE, "Manage roles", ""),
        ])
        .unwrap(),
    )
}

struct Harness {
    system: RBACSystem,
    root: ActorId,
}

fn harness() -> Harness {
    let directory = InMemoryPlatformDirectory::with_superadmins(["root"]);
    directory.set_role(ActorId::from("owner"), PlatformRole::InstituteOwner { institute: InstituteId::from("s1") });

    let system = RBACSystem::new(RbacConfig::default().without_seed(), small_catalog(), Arc::new(MemoryRepository::new()), Arc::new(directory));

    Harness {
        system,
        root: ActorId::from("root"),
    }
}

#[tokio::test]
async fn teacher_role_scenario() {
    let h = harness();
    let s1 = Scope::institute("s1");
    let a = ActorId::from("actor-a");

    let teacher = h.system.create_role(&h.root, &s1, NewRole::new("Teacher", "teacher", [DASHBOARD_VIEW, STUDENTS_MANAGE])).await.unwrap();
    h.system.assign_role(&h.root, &s1, &a, teacher.id).await.unwrap();

    assert!(h.system.authorize(&a, &s1, STUDENTS_MANAGE).await);
    assert!(!h.system.authorize(&a, &s1, ROLES_MANAGE).await);

    // No assignment in S2 is a deny, not an error
    assert!(!h.system.authorize(&a, &Scope::institute("s2"), DASHBOARD_VIEW).await);
    assert!(matches!(
        h.system.resolve_actor_access(&a, &Scope::institute("s2")).await,
        Err(AuthzError::NoAssignment { .. })
    ));

    // AND and OR forms
    assert!(h.system.authorize(&a, &s1, [DASHBOARD_VIEW, STUDENTS_MANAGE]).await);
    assert!(!h.system.authorize(&a, &s1, [DASHBOARD_VIEW, ROLES_MANAGE]).await);
    assert!(h.system.authorize_any(&a, &s1, &[ROLES_MANAGE, DASHBOARD_VIEW]).await);
    assert!(!h.system.authorize_any::<&str>(&a, &s1, &[]).await);
}

#[tokio::test]
async fn full_access_without_assignment() {
    let h = harness();
    let s1 = Scope::institute("s1");

    assert!(h.system.authorize(&h.root, &s1, ROLES_MANAGE).await);
    assert!(h.system.authorize_any::<&str>(&h.root, &s1, &[]).await);

    let mine = h.system.my_permissions(&h.root, &s1).await.unwrap();
    assert!(mine.full_access);
    assert!(mine.role_name.is_none());
    assert!(mine.permission_keys.is_empty());

    // Institute owners have full access only at home
    let owner = ActorId::from("owner");
    assert!(h.system.authorize(&owner, &s1, ROLES_MANAGE).await);
    assert!(!h.system.authorize(&owner, &Scope::institute("s2"), ROLES_MANAGE).await);
}

#[tokio::test]
async fn role_keys_are_unique_per_scope() {
    let h = harness();
    let s1 = Scope::institute("s1");
    let s2 = Scope::institute("s2");

    h.system.create_role(&h.root, &s1, NewRole::new("Teacher", "teacher", [DASHBOARD_VIEW])).await.unwrap();

    let duplicate = h.system.create_role(&h.root, &s1, NewRole::new("Teacher again", "teacher", [DASHBOARD_VIEW])).await;
    assert!(matches!(duplicate, Err(AuthzError::DuplicateKey { ref key, .. }) if key == "teacher"));

    assert!(h.system.create_role(&h.root, &s2, NewRole::new("Teacher", "teacher", [DASHBOARD_VIEW])).await.is_ok());
}

#[tokio::test]
async fn role_creation_validates_permissions() {
    let h = harness();
    let s1 = Scope::institute("s1");

    let empty = h.system.create_role(&h.root, &s1, NewRole::new("Nothing", "nothing", Vec::<&str>::new())).await;
    assert_eq!(empty.unwrap_err(), AuthzError::EmptyPermissionSet);

    let unknown = h.system.create_role(&h.root, &s1, NewRole::new("Pilot", "pilot", ["planes.fly"])).await;
    assert_eq!(unknown.unwrap_err(), AuthzError::UnknownPermission { key: "planes.fly".to_string() });
}

#[tokio::test]
async fn assigned_role_cannot_be_deleted() {
    let h = harness();
    let s1 = Scope::institute("s1");
    let a = ActorId::from("actor-a");

    let role = h.system.create_role(&h.root, &s1, NewRole::new("Clerk", "clerk", [DASHBOARD_VIEW])).await.unwrap();
    h.system.assign_role(&h.root, &s1, &a, role.id).await.unwrap();

    let rejected = h.system.delete_role(&h.root, &s1, role.id, None).await;
    assert!(matches!(rejected, Err(AuthzError::RoleInUse { assignments: 1, .. })));

    // The rejected delete left everything in place
    assert!(h.system.authorize(&a, &s1, DASHBOARD_VIEW).await);

    h.system.unassign_role(&h.root, &s1, &a).await.unwrap();
    h.system.delete_role(&h.root, &s1, role.id, None).await.unwrap();
    assert!(!h.system.authorize(&a, &s1, DASHBOARD_VIEW).await);
}

#[tokio::test]
async fn system_roles_are_immutable_even_for_superadmins() {
    let system = RBACSystem::initialize(
        RbacConfig::default(),
        Arc::new(MemoryRepository::new()),
        Arc::new(InMemoryPlatformDirectory::with_superadmins(["root"])),
    )
    .await
    .unwrap();
    let root = ActorId::from("root");
    let s1 = Scope::institute("s1");

    let viewer = system.list_roles(&root, &s1).await.unwrap().into_iter().find(|r| r.key == "viewer").unwrap();

    let result = system.update_role(&root, &s1, viewer.id, RolePatch::new().permissions(["roles.manage"])).await;
    assert!(matches!(result, Err(AuthzError::SystemRoleImmutable { .. })));

    let result = system.update_role(&root, &s1, viewer.id, RolePatch::new().key("watcher")).await;
    assert!(matches!(result, Err(AuthzError::SystemRoleImmutable { .. })));

    let result = system.delete_role(&root, &s1, viewer.id, None).await;
    assert!(matches!(result, Err(AuthzError::SystemRoleImmutable { .. })));

    // Identical permission set and a new name are accepted
    let renamed = system
        .update_role(&root, &s1, viewer.id, RolePatch::new().name("Observer").permissions(viewer.permission_keys.clone()))
        .await
        .unwrap();
    assert_eq!(renamed.name, "Observer");
    assert_eq!(renamed.permission_keys, viewer.permission_keys);
}

#[tokio::test]
async fn stale_writer_gets_concurrent_modification() {
    let h = harness();
    let s1 = Scope::institute("s1");

    let role = h.system.create_role(&h.root, &s1, NewRole::new("Clerk", "clerk", [DASHBOARD_VIEW])).await.unwrap();

    let first = h.system.update_role(&h.root, &s1, role.id, RolePatch::new().name("Clerk A").expect_version(role.version));
    let second = h.system.update_role(&h.root, &s1, role.id, RolePatch::new().name("Clerk B").expect_version(role.version));
    let (first, second) = futures::join!(first, second);

    let outcomes = [first, second];
    let winners: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    let conflicts = outcomes.iter().filter(|r| matches!(r, Err(AuthzError::ConcurrentModification { .. }))).count();

    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts, 1);

    let stored = h.system.role_manager().get_role(role.id).await.unwrap();
    assert_eq!(stored.name, winners[0].name);
    assert_eq!(stored.version, role.version + 1);
}

#[tokio::test]
async fn reassignment_replaces_previous_role() {
    let h = harness();
    let s1 = Scope::institute("s1");
    let a = ActorId::from("actor-a");

    let viewer = h.system.create_role(&h.root, &s1, NewRole::new("Viewer", "viewer", [DASHBOARD_VIEW])).await.unwrap();
    let manager = h.system.create_role(&h.root, &s1, NewRole::new("Manager", "manager", [ROLES_MANAGE])).await.unwrap();

    h.system.assign_role(&h.root, &s1, &a, viewer.id).await.unwrap();
    h.system.assign_role(&h.root, &s1, &a, manager.id).await.unwrap();

    assert!(h.system.authorize(&a, &s1, ROLES_MANAGE).await);
    assert!(!h.system.authorize(&a, &s1, DASHBOARD_VIEW).await);
    assert_eq!(h.system.assignment_manager().count_for_role(viewer.id).await.unwrap(), 0);

    // The new manager can now administer roles in S1 but nowhere else
    let other = ActorId::from("actor-b");
    assert!(h.system.assign_role(&a, &s1, &other, viewer.id).await.is_ok());
    assert!(matches!(
        h.system.assign_role(&a, &Scope::institute("s2"), &other, viewer.id).await,
        Err(AuthzError::Forbidden { .. })
    ));
}

#[tokio::test]
async fn removing_an_actor_drops_all_assignments() {
    let h = harness();
    let a = ActorId::from("actor-a");

    for institute in ["s1", "s2"] {
        let scope = Scope::institute(institute);
        let role = h.system.create_role(&h.root, &scope, NewRole::new("Clerk", "clerk", [DASHBOARD_VIEW])).await.unwrap();
        h.system.assign_role(&h.root, &scope, &a, role.id).await.unwrap();
    }

    // Institute owners cannot delete accounts platform-wide
    assert!(matches!(h.system.remove_actor(&ActorId::from("owner"), &a).await, Err(AuthzError::Forbidden { .. })));

    assert_eq!(h.system.remove_actor(&h.root, &a).await.unwrap(), 2);
    assert!(!h.system.authorize(&a, &Scope::institute("s1"), DASHBOARD_VIEW).await);
    assert!(!h.system.authorize(&a, &Scope::institute("s2"), DASHBOARD_VIEW).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deleting_a_role_races_assigning_it() {
    let h = harness();
    let s1 = Scope::institute("s1");

    for i in 0..200 {
        let role = h.system.create_role(&h.root, &s1, NewRole::new("Clerk", &format!("clerk_{}", i), [DASHBOARD_VIEW])).await.unwrap();
        let role_id = role.id;
        let actor = ActorId::new(format!("actor-{}", i));

        let deleter = {
            let (system, root, scope) = (h.system.clone(), h.root.clone(), s1.clone());
            tokio::spawn(async move { system.delete_role(&root, &scope, role_id, None).await })
        };
        let assigner = {
            let (system, root, scope, actor) = (h.system.clone(), h.root.clone(), s1.clone(), actor.clone());
            tokio::spawn(async move { system.assign_role(&root, &scope, &actor, role_id).await })
        };

        let deleted = deleter.await.unwrap();
        let assigned = assigner.await.unwrap();

        match (&deleted, &assigned) {
            (Ok(_), Err(AuthzError::NotFound { .. })) => {
                assert!(!h.system.authorize(&actor, &s1, DASHBOARD_VIEW).await);
            }
            (Err(AuthzError::RoleInUse { .. }), Ok(_)) => {
                let access = h.system.resolve_actor_access(&actor, &s1).await.unwrap();
                assert_eq!(access.role.map(|r| r.id), Some(role_id));
            }
            other => panic!("round {} ended with {:?}", i, other),
        }

        // No assignment may outlive its role
        if let Some((_, stored_role)) = h.system.assignment_manager().resolve(&actor, &s1).await.unwrap() {
            assert!(stored_role.is_some());
        }
    }
}

#[tokio::test]
async fn catalog_extension_reaches_institute_admins_on_restart() {
    let repository = Arc::new(MemoryRepository::new());
    let directory = Arc::new(InMemoryPlatformDirectory::with_superadmins(["root"]));
    let root = ActorId::from("root");
    let s1 = Scope::institute("s1");
    let a = ActorId::from("actor-a");

    let first = RBACSystem::initialize(RbacConfig::default(), repository.clone(), directory.clone()).await.unwrap();
    let admin = first.list_roles(&root, &s1).await.unwrap().into_iter().find(|r| r.key == "institute_admin").unwrap();
    first.assign_role(&root, &s1, &a, admin.id).await.unwrap();
    assert!(!first.authorize(&a, &s1, "library.lend").await);

    // Next deployment ships one more permission
    let catalog = PermissionCatalog::builtin()
        .unwrap()
        .extend(vec![PermissionDefinition::new("library", "library.lend", "Lend books", "")])
        .unwrap();
    let second = RBACSystem::new(RbacConfig::default(), Arc::new(catalog), repository, directory);
    assert_eq!(second.role_manager().seed_system_roles().await.unwrap(), 1);

    assert!(second.authorize(&a, &s1, "library.lend").await);
    assert!(second.authorize(&a, &s1, ROLES_MANAGE).await);
}
