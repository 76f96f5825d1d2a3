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

//! HTTP server implementation using Hyper

use crate::auth::JwtManager;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::router::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use lyceum_authz::{ActorId, InMemoryPlatformDirectory, InstituteId, MemoryRepository, PlatformRole, RBACSystem};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// API server using Hyper
pub struct ApiServer {
    bind_address: SocketAddr,
    router: Arc<Router>,
}

impl ApiServer {
    /// Create a new API server backed by the in-memory repository
    pub async fn new(config: Config) -> ApiResult<Self> {
        // Parse bind address
        let bind_address: SocketAddr = config.bind_address.parse().map_err(|e| ApiError::InternalServerError {
            message: format!("Invalid bind address '{}': {}", config.bind_address, e),
        })?;

        let directory = InMemoryPlatformDirectory::with_superadmins(config.platform_superadmins.iter().map(String::as_str));
        for (actor, institute) in &config.institute_owners {
            directory.set_role(ActorId::from(actor.as_str()), PlatformRole::InstituteOwner { institute: InstituteId::from(institute.as_str()) });
        }
        let rbac = RBACSystem::initialize(config.rbac.clone(), Arc::new(MemoryRepository::new()), Arc::new(directory)).await?;

        let jwt = JwtManager::new(&config.jwt_secret, &config.jwt_issuer, &config.jwt_audience);
        let router = Arc::new(Router::new(Arc::new(rbac), Arc::new(jwt), config.max_body_size));

        info!(
            superadmins = config.platform_superadmins.len(),
            institute_owners = config.institute_owners.len(),
            permissions = router.rbac().catalog().len(),
            "API server created successfully"
        );

        Ok(Self { bind_address, router })
    }

    /// Get the bind address
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Start the server
    pub async fn run(self) -> ApiResult<()> {
        // Create TCP listener
        let listener = TcpListener::bind(self.bind_address).await?;

        info!("Lyceum RBAC API listening on http://{}", self.bind_address);

        // Accept connections
        loop {
            let (stream, remote_addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let io = TokioIo::new(stream);
            let router = self.router.clone();

            // Spawn a task to handle the connection
            tokio::task::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let router = router.clone();
                    async move {
                        let path = req.uri().path().to_string();
                        match router.route(req).await {
                            Ok(response) => Ok::<_, Infallible>(response),
                            Err(e) => Ok(e.into_response(&path)),
                        }
                    }
                });

                // Serve the connection
                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {}: {}", remote_addr, err);
                }
            });
        }
    }
}
