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

//! HTTP routing for the RBAC API

use crate::auth::{Claims, JwtManager, extract_token_from_header};
use crate::error::{ApiError, ApiResult};
use crate::handlers::{assignments, health, permissions, roles};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::HeaderMap;
use hyper::{Method, Request, Response};
use lyceum_authz::RBACSystem;
use std::sync::Arc;
use tracing::{info, warn};

/// Paths served without a bearer token
const PUBLIC_PATHS: [&str; 1] = ["/api/v1/health"];

/// Known resources; the method is matched separately so that a known path
/// with the wrong method answers 405 instead of 404.
enum Route<'a> {
    Health,
    Permissions,
    MyPermissions,
    Roles,
    Role(&'a str),
    Assignment(&'a str),
}

impl<'a> Route<'a> {
    fn parse(path: &'a str) -> Option<Self> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match segments.as_slice() {
            ["api", "v1", "health"] => Some(Route::Health),
            ["api", "v1", "rbac", "permissions"] => Some(Route::Permissions),
            ["api", "v1", "rbac", "me", "permissions"] => Some(Route::MyPermissions),
            ["api", "v1", "rbac", "roles"] => Some(Route::Roles),
            ["api", "v1", "rbac", "roles", id] if !id.is_empty() => Some(Route::Role(id)),
            ["api", "v1", "rbac", "assignments", actor] if !actor.is_empty() => Some(Route::Assignment(actor)),
            _ => None,
        }
    }
}

/// HTTP router for the RBAC API
pub struct Router {
    rbac: Arc<RBACSystem>,
    jwt: Arc<JwtManager>,
    max_body_size: usize,
}

impl Router {
    pub fn new(rbac: Arc<RBACSystem>, jwt: Arc<JwtManager>, max_body_size: usize) -> Self {
        Self { rbac, jwt, max_body_size }
    }

    pub fn rbac(&self) -> &Arc<RBACSystem> {
        &self.rbac
    }

    /// Route a request to the appropriate handler
    pub async fn route<B>(&self, req: Request<B>) -> ApiResult<Response<Full<Bytes>>>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path();
        let query = parts.uri.query();
        let method = &parts.method;

        info!("Routing request: {} {}", method, path);

        let claims = if PUBLIC_PATHS.contains(&path) { None } else { Some(self.authenticate(&parts.headers)?) };

        let Some(route) = Route::parse(path) else {
            return Err(ApiError::NotFound {
                message: format!("No route for {}", path),
            });
        };

        let body = if *method == Method::POST || *method == Method::PUT {
            self.read_body(body).await?
        } else {
            Bytes::new()
        };

        let rbac = self.rbac.as_ref();

        match (route, claims.as_ref()) {
            (Route::Health, _) if *method == Method::GET => health::health_check(rbac).await,
            (Route::Permissions, Some(_)) if *method == Method::GET => permissions::list_permissions(rbac).await,
            (Route::MyPermissions, Some(claims)) if *method == Method::GET => permissions::my_permissions(rbac, claims).await,
            (Route::Roles, Some(claims)) if *method == Method::GET => roles::list_roles(rbac, claims).await,
            (Route::Roles, Some(claims)) if *method == Method::POST => roles::create_role(rbac, claims, &body).await,
            (Route::Role(id), Some(claims)) if *method == Method::PUT => roles::update_role(rbac, claims, id, &body).await,
            (Route::Role(id), Some(claims)) if *method == Method::DELETE => roles::delete_role(rbac, claims, id, query).await,
            (Route::Assignment(actor), Some(claims)) if *method == Method::PUT => assignments::assign_role(rbac, claims, actor, &body).await,
            (Route::Assignment(actor), Some(claims)) if *method == Method::DELETE => assignments::unassign_role(rbac, claims, actor).await,
            _ => Err(ApiError::MethodNotAllowed {
                message: format!("{} is not supported on {}", method, path),
            }),
        }
    }

    /// Validate the bearer token
    fn authenticate(&self, headers: &HeaderMap) -> ApiResult<Claims> {
        let Some(auth_header) = headers.get("authorization") else {
            warn!("Missing authorization header");
            return Err(ApiError::Unauthorized {
                message: "No authentication information found".to_string(),
            });
        };

        let auth_str = auth_header.to_str().map_err(|_| ApiError::Unauthorized {
            message: "Invalid authorization header encoding".to_string(),
        })?;

        let token = extract_token_from_header(auth_str)?;

        self.jwt.validate_token(token).map_err(|e| {
            warn!("Token validation failed: {}", e);
            ApiError::Unauthorized {
                message: "Invalid or expired token".to_string(),
            }
        })
    }

    async fn read_body<B>(&self, body: B) -> ApiResult<Bytes>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match Limited::new(body, self.max_body_size).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(ApiError::PayloadTooLarge {
                message: format!("Request body exceeds {} bytes", self.max_body_size),
            }),
            Err(e) => Err(ApiError::BadRequest {
                message: format!("Failed to read request body: {}", e),
            }),
        }
    }
}
