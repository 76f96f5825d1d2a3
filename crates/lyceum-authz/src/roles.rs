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

//! Role definitions

use crate::catalog::{PermissionCatalog, PermissionKey, keys};
use crate::error::{AuthzError, AuthzResult};
use crate::scope::Scope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Maximum length of a role key
pub const MAX_ROLE_KEY_LEN: usize = 64;

/// Maximum length of a role name
pub const MAX_ROLE_NAME_LEN: usize = 120;

/// Unique role identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(Uuid);

impl RoleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RoleId {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self).map_err(|_| AuthzError::NotFound {
            message: format!("Role {} not found", s),
        })
    }
}

/// A named set of permission keys, owned by a scope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    /// Unique role identifier
    pub id: RoleId,

    /// Human-readable role name
    pub name: String,

    /// Stable key, unique within the owning scope
    pub key: String,

    /// Role description
    pub description: String,

    /// Scope owning this role (platform for shipped system roles)
    pub scope: Scope,

    /// Inactive roles stay assigned but grant nothing
    pub is_active: bool,

    /// Whether this is a platform-defined role
    pub is_system: bool,

    /// Permissions granted by this role
    pub permission_keys: BTreeSet<PermissionKey>,

    /// Revision number used for compare-and-swap updates
    pub version: u64,

    /// Role creation timestamp
    pub created_at: DateTime<Utc>,

    /// Role last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Create a new custom role owned by `scope`
    pub fn new(scope: Scope, new_role: NewRole) -> Self {
        let now = Utc::now();

        Self {
            id: RoleId::new(),
            name: new_role.name.trim().to_string(),
            key: new_role.key.trim().to_string(),
            description: new_role.description.trim().to_string(),
            scope,
            is_active: true,
            is_system: false,
            permission_keys: new_role.permission_keys,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a platform-wide system role
    pub fn system_role(key: &str, name: &str, description: &str, permission_keys: BTreeSet<PermissionKey>) -> Self {
        let mut role = Self::new(
            Scope::Platform,
            NewRole {
                name: name.to_string(),
                key: key.to_string(),
                description: description.to_string(),
                permission_keys,
            },
        );
        role.is_system = true;
        role
    }

    /// Whether this role grants `key` (inactive roles grant nothing)
    pub fn grants(&self, key: &str) -> bool {
        self.is_active && self.permission_keys.contains(key)
    }

    /// Keys an actor holding this role effectively receives
    pub fn effective_keys(&self) -> BTreeSet<PermissionKey> {
        if self.is_active { self.permission_keys.clone() } else { BTreeSet::new() }
    }
}

/// Input for creating a role
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewRole {
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub description: String,
    pub permission_keys: BTreeSet<PermissionKey>,
}

impl NewRole {
    pub fn new<I, K>(name: &str, key: &str, permission_keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<PermissionKey>,
    {
        Self {
            name: name.to_string(),
            key: key.to_string(),
            description: String::new(),
            permission_keys: permission_keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// Partial update of a role. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RolePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub key: Option<String>,
    pub permission_keys: Option<BTreeSet<PermissionKey>>,
    pub is_active: Option<bool>,

    /// Version the caller last read; a mismatch fails with `ConcurrentModification`
    pub expected_version: Option<u64>,
}

impl RolePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn permissions<I, K>(mut self, permission_keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<PermissionKey>,
    {
        self.permission_keys = Some(permission_keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn expect_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// Describe the protected fields this patch would change on `role`
    pub fn protected_changes(&self, role: &Role) -> Vec<&'static str> {
        let mut changes = Vec::new();

        if self.key.as_deref().is_some_and(|key| key.trim() != role.key) {
            changes.push("key");
        }
        if self.permission_keys.as_ref().is_some_and(|keys| *keys != role.permission_keys) {
            changes.push("permission_keys");
        }
        if self.is_active.is_some_and(|active| active != role.is_active) {
            changes.push("is_active");
        }

        changes
    }
}

/// Role keys are lowercase slugs: `[a-z0-9_]+`
pub fn validate_role_key(key: &str) -> AuthzResult<()> {
    let key = key.trim();

    if key.is_empty() || key.len() > MAX_ROLE_KEY_LEN {
        return Err(AuthzError::InvalidRole {
            message: format!("role key must be 1 to {} characters", MAX_ROLE_KEY_LEN),
        });
    }

    if !key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(AuthzError::InvalidRole {
            message: format!("role key '{}' may only contain lowercase letters, digits and underscores", key),
        });
    }

    Ok(())
}

pub fn validate_role_name(name: &str) -> AuthzResult<()> {
    let name = name.trim();

    if name.is_empty() || name.chars().count() > MAX_ROLE_NAME_LEN {
        return Err(AuthzError::InvalidRole {
            message: format!("role name must be 1 to {} characters", MAX_ROLE_NAME_LEN),
        });
    }

    Ok(())
}

/// Platform-wide system roles seeded at startup
pub fn create_default_roles(catalog: &PermissionCatalog) -> Vec<Role> {
    let pick = |wanted: &[&str]| -> BTreeSet<PermissionKey> { wanted.iter().filter(|key| catalog.exists(key)).map(|key| PermissionKey::from(*key)).collect() };

    vec![
        Role::system_role("institute_admin", "Institute Administrator", "Every permission within an institute", catalog.all_keys()),
        Role::system_role(
            "teacher",
            "Teacher",
            "Runs courses, exams and interviews",
            pick(&[
                keys::DASHBOARD_VIEW,
                keys::STUDENTS_VIEW,
                keys::COURSES_VIEW,
                keys::EXAMS_VIEW,
                keys::EXAMS_MANAGE,
                keys::EXAMS_GRADE,
                keys::INTERVIEWS_VIEW,
                keys::INTERVIEWS_CONDUCT,
                keys::ANALYSIS_VIEW,
                keys::ANALYSIS_RUN,
                keys::REPORTS_VIEW,
            ]),
        ),
        Role::system_role(
            "student",
            "Student",
            "Attends courses and takes exams",
            pick(&[keys::DASHBOARD_VIEW, keys::COURSES_VIEW, keys::EXAMS_VIEW, keys::INTERVIEWS_VIEW]),
        ),
        Role::system_role(
            "viewer",
            "Viewer",
            "Read-only access to institute data",
            pick(&[
                keys::DASHBOARD_VIEW,
                keys::STUDENTS_VIEW,
                keys::TEACHERS_VIEW,
                keys::COURSES_VIEW,
                keys::EXAMS_VIEW,
                keys::REPORTS_VIEW,
                keys::ROLES_VIEW,
                keys::SETTINGS_VIEW,
            ]),
        ),
    ]
}
