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

//! HTTP routing tests against the in-memory engine

use chrono::Duration;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode};
use lyceum_api::auth::JwtManager;
use lyceum_api::router::Router;
use lyceum_authz::{ActorId, InMemoryPlatformDirectory, InstituteId, MemoryRepository, PlatformRole, RBACSystem, RbacConfig};
use serde_json::{Value, json};
use std::sync::Arc;

struct TestApp {
    router: Router,
    jwt: Arc<JwtManager>,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_body_limit(1024 * 1024).await
    }

    async fn with_body_limit(max_body_size: usize) -> Self {
        let directory = InMemoryPlatformDirectory::with_superadmins(["root"]);
        directory.set_role(ActorId::from("owner"), PlatformRole::InstituteOwner { institute: InstituteId::from("s1") });

        let rbac = RBACSystem::initialize(RbacConfig::default(), Arc::new(MemoryRepository::new()), Arc::new(directory)).await.unwrap();
        let jwt = Arc::new(JwtManager::new("test-secret", "lyceum-auth", "lyceum"));

        Self {
            router: Router::new(Arc::new(rbac), jwt.clone(), max_body_size),
            jwt,
        }
    }

    fn token(&self, actor: &str, institute: Option<&str>) -> String {
        self.jwt.issue(actor, institute, Duration::minutes(5)).unwrap()
    }

    async fn send(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let body = body.map(|value| Bytes::from(value.to_string())).unwrap_or_default();
        let request = builder.body(Full::new(body)).unwrap();

        let response = match self.router.route(request).await {
            Ok(response) => response,
            Err(e) => e.into_response(path),
        };

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    async fn permission_id(&self, token: &str, key: &str) -> Value {
        let (_, catalog) = self.send(Method::GET, "/api/v1/rbac/permissions", Some(token), None).await;
        catalog["modules"]
            .as_array()
            .unwrap()
            .iter()
            .flat_map(|module| module["permissions"].as_array().unwrap().iter())
            .find(|permission| permission["key"] == key)
            .map(|permission| permission["id"].clone())
            .unwrap()
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/api/v1/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/api/v1/rbac/roles", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["type"], "/problems/unauthorized");

    let (status, _) = app.send(Method::GET, "/api/v1/rbac/roles", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A blank institute must not fall back to the platform scope
    let blank = app.token("root", Some("  "));
    let (status, body) = app.send(Method::GET, "/api/v1/rbac/roles", Some(&blank), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["type"], "/problems/unauthorized");
}

#[tokio::test]
async fn unknown_paths_and_methods() {
    let app = TestApp::new().await;
    let token = app.token("root", Some("s1"));

    let (status, _) = app.send(Method::GET, "/api/v1/rbac/nothing", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(Method::PATCH, "/api/v1/rbac/roles", Some(&token), None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn member_without_role_is_forbidden() {
    let app = TestApp::new().await;
    let token = app.token("a1", Some("s1"));

    let (status, body) = app.send(Method::GET, "/api/v1/rbac/roles", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["type"], "/problems/forbidden");

    let (status, body) = app.send(Method::POST, "/api/v1/rbac/roles", Some(&token), Some(json!({"name": "X", "key": "x", "permission_ids": [1]}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["type"], "/problems/forbidden");

    // Own permissions are always readable
    let (status, body) = app.send(Method::GET, "/api/v1/rbac/me/permissions", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["permission_keys"], json!([]));
    assert_eq!(body["full_access"], false);
}

#[tokio::test]
async fn owner_manages_roles_and_assignments() {
    let app = TestApp::new().await;
    let owner = app.token("owner", Some("s1"));
    let dashboard = app.permission_id(&owner, "dashboard.view").await;

    let (status, role) = app
        .send(
            Method::POST,
            "/api/v1/rbac/roles",
            Some(&owner),
            Some(json!({"name": "Clerk", "key": "clerk", "description": "Front desk", "permission_ids": [dashboard]})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(role["institute_id"], "s1");
    assert_eq!(role["permission_keys"], json!(["dashboard.view"]));
    let role_id = role["id"].as_str().unwrap().to_string();

    let (status, body) = app.send(Method::POST, "/api/v1/rbac/roles", Some(&owner), Some(json!({"name": "Clerk 2", "key": "clerk", "permission_ids": [dashboard]}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["type"], "/problems/duplicate_key");

    let (status, _) = app
        .send(Method::PUT, "/api/v1/rbac/assignments/a1", Some(&owner), Some(json!({ "role_id": role_id })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let member = app.token("a1", Some("s1"));
    let (status, mine) = app.send(Method::GET, "/api/v1/rbac/me/permissions", Some(&member), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["permission_keys"], json!(["dashboard.view"]));
    assert_eq!(mine["role_name"], "Clerk");

    let role_path = format!("/api/v1/rbac/roles/{}", role_id);
    let (status, body) = app.send(Method::DELETE, &role_path, Some(&owner), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["type"], "/problems/role_in_use");
    assert_eq!(body["assignments"], 1);

    let (status, _) = app.send(Method::DELETE, "/api/v1/rbac/assignments/a1", Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::DELETE, &role_path, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::DELETE, &role_path, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_role_definitions_are_unprocessable() {
    let app = TestApp::new().await;
    let owner = app.token("owner", Some("s1"));

    let (status, body) = app.send(Method::POST, "/api/v1/rbac/roles", Some(&owner), Some(json!({"name": "Empty", "key": "empty", "permission_ids": []}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["type"], "/problems/empty_permission_set");

    let (status, body) = app.send(Method::POST, "/api/v1/rbac/roles", Some(&owner), Some(json!({"name": "Ghost", "key": "ghost", "permission_ids": [9999]}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["permission"], "#9999");
}

#[tokio::test]
async fn stale_version_conflicts() {
    let app = TestApp::new().await;
    let owner = app.token("owner", Some("s1"));
    let dashboard = app.permission_id(&owner, "dashboard.view").await;

    let (_, role) = app.send(Method::POST, "/api/v1/rbac/roles", Some(&owner), Some(json!({"name": "Clerk", "key": "clerk", "permission_ids": [dashboard]}))).await;
    let role_path = format!("/api/v1/rbac/roles/{}", role["id"].as_str().unwrap());
    let version = role["version"].as_u64().unwrap();

    let (status, updated) = app.send(Method::PUT, &role_path, Some(&owner), Some(json!({"name": "Desk", "version": version}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Desk");
    assert_eq!(updated["version"], version + 1);

    let (status, body) = app.send(Method::PUT, &role_path, Some(&owner), Some(json!({"name": "Late", "version": version}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["type"], "/problems/concurrent_modification");
    assert_eq!(body["retryable"], true);

    let (status, _) = app.send(Method::DELETE, &format!("{}?version={}", role_path, version), Some(&owner), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Assignments carry their own version
    let role_id = role["id"].clone();
    let (status, assignment) = app.send(Method::PUT, "/api/v1/rbac/assignments/a1", Some(&owner), Some(json!({"role_id": role_id, "version": 0}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assignment["version"], 1);

    let (status, body) = app.send(Method::PUT, "/api/v1/rbac/assignments/a1", Some(&owner), Some(json!({"role_id": role_id, "version": 0}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["type"], "/problems/concurrent_modification");

    let (status, assignment) = app.send(Method::PUT, "/api/v1/rbac/assignments/a1", Some(&owner), Some(json!({"role_id": role_id, "version": 1}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assignment["version"], 2);
}

#[tokio::test]
async fn system_role_permissions_cannot_change() {
    let app = TestApp::new().await;
    let root = app.token("root", Some("s1"));
    let billing = app.permission_id(&root, "billing.manage").await;

    let (_, roles) = app.send(Method::GET, "/api/v1/rbac/roles", Some(&root), None).await;
    let viewer = roles["roles"].as_array().unwrap().iter().find(|role| role["key"] == "viewer").unwrap().clone();
    assert_eq!(viewer["is_system"], true);

    let path = format!("/api/v1/rbac/roles/{}", viewer["id"].as_str().unwrap());
    let (status, body) = app.send(Method::PUT, &path, Some(&root), Some(json!({"permission_ids": [billing]}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["type"], "/problems/system_role_immutable");

    // Same set again is accepted
    let (status, _) = app.send(Method::PUT, &path, Some(&root), Some(json!({"permission_ids": viewer["permission_ids"]}))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_and_oversized_bodies() {
    let app = TestApp::with_body_limit(64).await;
    let owner = app.token("owner", Some("s1"));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/rbac/roles")
        .header("authorization", format!("Bearer {}", owner))
        .body(Full::new(Bytes::from_static(b"{not json")))
        .unwrap();
    match app.router.route(request).await {
        Err(err) => assert_eq!(err.status_code(), StatusCode::BAD_REQUEST),
        Ok(response) => panic!("expected an error, got {}", response.status()),
    }

    let description = "x".repeat(200);
    let (status, _) = app
        .send(Method::POST, "/api/v1/rbac/roles", Some(&owner), Some(json!({"name": "Big", "key": "big", "description": description, "permission_ids": [1]})))
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn malformed_role_id_is_gated_first() {
    let app = TestApp::new().await;
    let owner = app.token("owner", Some("s1"));
    let member = app.token("a1", Some("s1"));

    let (status, _) = app.send(Method::DELETE, "/api/v1/rbac/roles/not-a-uuid", Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(Method::DELETE, "/api/v1/rbac/roles/not-a-uuid", Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
