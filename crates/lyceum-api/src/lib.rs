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

//! Lyceum RBAC HTTP API
//!
//! Exposes the authorization engine in `lyceum-authz` over REST: the
//! permission catalog, role management, role assignment and the caller's own
//! permissions. Every route except health requires a bearer JWT whose `sub`
//! names the actor and whose optional `institute_id` names the scope.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod server;
