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

//! Error types for the authorization engine

use crate::roles::RoleId;
use crate::scope::{ActorId, Scope};
use thiserror::Error;

/// Errors produced by the RBAC engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Unknown permission: {key}")]
    UnknownPermission { key: String },

    #[error("Role key '{key}' is already used in scope {scope}")]
    DuplicateKey { key: String, scope: Scope },

    #[error("A role must grant at least one permission")]
    EmptyPermissionSet,

    #[error("System role {role_id} is immutable: {message}")]
    SystemRoleImmutable { role_id: RoleId, message: String },

    #[error("Role {role_id} is still assigned to {assignments} actor(s)")]
    RoleInUse { role_id: RoleId, assignments: usize },

    #[error("Actor '{actor_id}' has no role in scope {scope}")]
    NoAssignment { actor_id: ActorId, scope: Scope },

    #[error("Concurrent modification of {entity}: expected version {expected}, found {actual}")]
    ConcurrentModification { entity: String, expected: u64, actual: u64 },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Invalid role: {message}")]
    InvalidRole { message: String },

    #[error("Invalid permission catalog: {message}")]
    InvalidCatalog { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl AuthzError {
    /// Stable machine-readable identifier for this error
    pub fn code(&self) -> &'static str {
        match self {
            AuthzError::UnknownPermission { .. } => "unknown_permission",
            AuthzError::DuplicateKey { .. } => "duplicate_key",
            AuthzError::EmptyPermissionSet => "empty_permission_set",
            AuthzError::SystemRoleImmutable { .. } => "system_role_immutable",
            AuthzError::RoleInUse { .. } => "role_in_use",
            AuthzError::NoAssignment { .. } => "no_assignment",
            AuthzError::ConcurrentModification { .. } => "concurrent_modification",
            AuthzError::Forbidden { .. } => "forbidden",
            AuthzError::NotFound { .. } => "not_found",
            AuthzError::InvalidRole { .. } => "invalid_role",
            AuthzError::InvalidCatalog { .. } => "invalid_catalog",
            AuthzError::Storage { .. } => "internal_error",
        }
    }

    /// Caller mistakes that must be fixed in the request, never retried
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AuthzError::UnknownPermission { .. } | AuthzError::DuplicateKey { .. } | AuthzError::EmptyPermissionSet | AuthzError::InvalidRole { .. }
        )
    }

    /// The caller may re-read and reapply the operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthzError::ConcurrentModification { .. })
    }

    /// Failures of the system itself rather than of the request
    pub fn is_internal(&self) -> bool {
        matches!(self, AuthzError::Storage { .. } | AuthzError::InvalidCatalog { .. })
    }

    pub(crate) fn role_not_found(role_id: RoleId) -> Self {
        AuthzError::NotFound {
            message: format!("Role {} not found", role_id),
        }
    }
}

/// Result type for RBAC operations
pub type AuthzResult<T> = Result<T, AuthzError>;
