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

//! Role-Based Access Control (RBAC) engine for Lyceum institutes
//!
//! This crate provides:
//! - A closed, append-only permission catalog grouped by module
//! - Institute-scoped roles with immutable system roles
//! - One role assignment per actor and institute
//! - Pure AND/OR permission evaluation with a full-access override
//! - A fail-closed access facade used by every protected operation
//! - Audit logging of decisions and mutations

pub mod assignments;
pub mod audit;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod manager;
pub mod platform;
pub mod roles;
pub mod scope;
pub mod storage;
pub mod system;

pub use assignments::{AssignmentManager, RoleAssignment};
pub use audit::{AuditEvent, AuditEventType, AuditLogger, AuditResult, AuditStatistics};
pub use cache::{CacheStats, ScopedPermissionCache};
pub use catalog::{Permission, PermissionCatalog, PermissionDefinition, PermissionId, PermissionKey, PermissionModule};
pub use config::{AccessAuditMode, RbacConfig};
pub use error::{AuthzError, AuthzResult};
pub use evaluator::{EffectivePermissions, Requirement};
pub use manager::RoleManager;
pub use platform::{InMemoryPlatformDirectory, PlatformDirectory, PlatformRole};
pub use roles::{NewRole, Role, RoleId, RolePatch};
pub use scope::{ActorId, BlankInstituteId, InstituteId, Scope};
pub use storage::{MemoryRepository, RbacRepository, SystemRoleSync};
pub use system::{ActorAccess, MyPermissions, RBACSystem};
