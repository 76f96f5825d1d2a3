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

//! Permission catalog
//!
//! The catalog is the closed set of permissions roles may grant. It is built
//! once at startup from the built-in definitions, optionally extended by a
//! deployment-supplied JSON file, and never mutated afterwards. Extensions are
//! append-only: an existing key can never be redefined.

use crate::config::RbacConfig;
use crate::error::{AuthzError, AuthzResult};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Well-known permission keys
pub mod keys {
    pub const DASHBOARD_VIEW: &str = "dashboard.view";

    pub const STUDENTS_VIEW: &str = "students.view";
    pub const STUDENTS_MANAGE: &str = "students.manage";

    pub const TEACHERS_VIEW: &str = "teachers.view";
    pub const TEACHERS_MANAGE: &str = "teachers.manage";

    pub const COURSES_VIEW: &str = "courses.view";
    pub const COURSES_MANAGE: &str = "courses.manage";

    pub const EXAMS_VIEW: &str = "exams.view";
    pub const EXAMS_MANAGE: &str = "exams.manage";
    pub const EXAMS_GRADE: &str = "exams.grade";

    pub const INTERVIEWS_VIEW: &str = "interviews.view";
    pub const INTERVIEWS_CONDUCT: &str = "interviews.conduct";

    pub const ANALYSIS_VIEW: &str = "analysis.view";
    pub const ANALYSIS_RUN: &str = "analysis.run";

    pub const REPORTS_VIEW: &str = "reports.view";
    pub const REPORTS_EXPORT: &str = "reports.export";

    pub const BILLING_VIEW: &str = "billing.view";
    pub const BILLING_MANAGE: &str = "billing.manage";

    pub const ROLES_VIEW: &str = "roles.view";
    pub const ROLES_MANAGE: &str = "roles.manage";

    pub const SETTINGS_VIEW: &str = "settings.view";
    pub const SETTINGS_MANAGE: &str = "settings.manage";
}

/// (module, key, display name, description)
const BUILTIN_PERMISSIONS: &[(&str, &str, &str, &str)] = &[
    ("dashboard", keys::DASHBOARD_VIEW, "View dashboard", "Open the institute dashboard"),
    ("students", keys::STUDENTS_VIEW, "View students", "Browse student records"),
    ("students", keys::STUDENTS_MANAGE, "Manage students", "Create, edit and remove student records"),
    ("teachers", keys::TEACHERS_VIEW, "View teachers", "Browse teacher records"),
    ("teachers", keys::TEACHERS_MANAGE, "Manage teachers", "Create, edit and remove teacher records"),
    ("courses", keys::COURSES_VIEW, "View courses", "Browse courses and schedules"),
    ("courses", keys::COURSES_MANAGE, "Manage courses", "Create and edit courses and schedules"),
    ("exams", keys::EXAMS_VIEW, "View exams", "Browse exams and results"),
    ("exams", keys::EXAMS_MANAGE, "Manage exams", "Create and schedule exams"),
    ("exams", keys::EXAMS_GRADE, "Grade exams", "Enter and publish exam grades"),
    ("interviews", keys::INTERVIEWS_VIEW, "View interviews", "Browse interview sessions and transcripts"),
    ("interviews", keys::INTERVIEWS_CONDUCT, "Conduct interviews", "Start AI-assisted interview sessions"),
    ("analysis", keys::ANALYSIS_VIEW, "View analysis", "Read AI analysis reports"),
    ("analysis", keys::ANALYSIS_RUN, "Run analysis", "Request new AI analysis runs"),
    ("reports", keys::REPORTS_VIEW, "View reports", "Open institute reports"),
    ("reports", keys::REPORTS_EXPORT, "Export reports", "Download reports as files"),
    ("billing", keys::BILLING_VIEW, "View billing", "See subscription and invoices"),
    ("billing", keys::BILLING_MANAGE, "Manage billing", "Change subscription and payment methods"),
    ("roles", keys::ROLES_VIEW, "View roles", "Browse roles and their permissions"),
    ("roles", keys::ROLES_MANAGE, "Manage roles", "Create, edit, delete and assign roles"),
    ("settings", keys::SETTINGS_VIEW, "View settings", "Read institute settings"),
    ("settings", keys::SETTINGS_MANAGE, "Manage settings", "Change institute settings"),
];

/// Numeric permission identifier, stable for the life of a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionId(pub u32);

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Globally unique permission key such as `roles.manage`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionKey(String);

impl PermissionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Module prefix of the key (`roles` for `roles.manage`)
    pub fn module(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

impl Borrow<str> for PermissionKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PermissionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PermissionKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for PermissionKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    pub id: PermissionId,
    pub key: PermissionKey,
    pub display_name: String,
    pub module: String,
    pub description: String,
}

/// Definition used to build or extend the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionDefinition {
    pub key: String,
    pub display_name: String,
    pub module: String,
    #[serde(default)]
    pub description: String,
}

impl PermissionDefinition {
    pub fn new(module: &str, key: &str, display_name: &str, description: &str) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            module: module.to_string(),
            description: description.to_string(),
        }
    }
}

/// Permissions of one module, in catalog order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionModule {
    pub module: String,
    pub permissions: Vec<Permission>,
}

/// Immutable registry of permission definitions
#[derive(Debug, Clone)]
pub struct PermissionCatalog {
    permissions: Vec<Permission>,
    by_key: HashMap<PermissionKey, usize>,
    modules: Vec<PermissionModule>,
}

impl PermissionCatalog {
    /// Build a catalog from definitions. Ids are assigned in definition order starting at 1.
    pub fn from_definitions(definitions: impl IntoIterator<Item = PermissionDefinition>) -> AuthzResult<Self> {
        let mut catalog = Self {
            permissions: Vec::new(),
            by_key: HashMap::new(),
            modules: Vec::new(),
        };
        catalog.append(definitions)?;
        Ok(catalog)
    }

    /// The built-in permission set shipped with this release
    pub fn builtin() -> AuthzResult<Self> {
        Self::from_definitions(
            BUILTIN_PERMISSIONS
                .iter()
                .map(|(module, key, display_name, description)| PermissionDefinition::new(module, key, display_name, description)),
        )
    }

    /// Built-in permissions plus the optional extension file named by the configuration
    pub fn load(config: &RbacConfig) -> AuthzResult<Self> {
        let catalog = Self::builtin()?;

        match &config.catalog_path {
            Some(path) => {
                let extensions = Self::read_definitions(path)?;
                let catalog = catalog.extend(extensions)?;
                info!(path = %path.display(), permission_count = catalog.len(), "Permission catalog loaded with extensions");
                Ok(catalog)
            }
            None => {
                info!(permission_count = catalog.len(), "Permission catalog loaded");
                Ok(catalog)
            }
        }
    }

    /// Read a JSON array of permission definitions
    pub fn read_definitions(path: &Path) -> AuthzResult<Vec<PermissionDefinition>> {
        let raw = std::fs::read_to_string(path).map_err(|e| AuthzError::InvalidCatalog {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;

        serde_json::from_str(&raw).map_err(|e| AuthzError::InvalidCatalog {
            message: format!("cannot parse {}: {}", path.display(), e),
        })
    }

    /// Append new definitions. Existing keys cannot be redefined.
    pub fn extend(mut self, definitions: impl IntoIterator<Item = PermissionDefinition>) -> AuthzResult<Self> {
        self.append(definitions)?;
        Ok(self)
    }

    fn append(&mut self, definitions: impl IntoIterator<Item = PermissionDefinition>) -> AuthzResult<()> {
        for definition in definitions {
            let key = definition.key.trim();
            let module = definition.module.trim();

            if key.is_empty() || module.is_empty() {
                return Err(AuthzError::InvalidCatalog {
                    message: format!("permission definition '{}' needs both a key and a module", definition.key),
                });
            }

            let key = PermissionKey::new(key);
            if self.by_key.contains_key(&key) {
                return Err(AuthzError::InvalidCatalog {
                    message: format!("permission '{}' is defined more than once", key),
                });
            }

            let permission = Permission {
                id: PermissionId(self.permissions.len() as u32 + 1),
                key: key.clone(),
                display_name: definition.display_name,
                module: module.to_string(),
                description: definition.description,
            };

            match self.modules.iter_mut().find(|m| m.module == permission.module) {
                Some(group) => group.permissions.push(permission.clone()),
                None => self.modules.push(PermissionModule {
                    module: permission.module.clone(),
                    permissions: vec![permission.clone()],
                }),
            }

            self.by_key.insert(key, self.permissions.len());
            self.permissions.push(permission);
        }

        debug!(permission_count = self.permissions.len(), module_count = self.modules.len(), "Permission catalog built");
        Ok(())
    }

    /// Permissions grouped by module, modules in order of first definition
    pub fn list_permissions(&self) -> &[PermissionModule] {
        &self.modules
    }

    pub fn exists(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Permission> {
        self.by_key.get(key).map(|&index| &self.permissions[index])
    }

    pub fn lookup_id(&self, id: PermissionId) -> Option<&Permission> {
        (id.0 as usize).checked_sub(1).and_then(|index| self.permissions.get(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter()
    }

    /// Every key in the catalog
    pub fn all_keys(&self) -> BTreeSet<PermissionKey> {
        self.permissions.iter().map(|p| p.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Fail with `UnknownPermission` on the first key absent from the catalog
    pub fn validate_keys<'a>(&self, keys: impl IntoIterator<Item = &'a PermissionKey>) -> AuthzResult<()> {
        match keys.into_iter().find(|key| !self.exists(key.as_str())) {
            Some(unknown) => Err(AuthzError::UnknownPermission { key: unknown.to_string() }),
            None => Ok(()),
        }
    }

    /// Translate permission ids (as sent by the role editor) into keys.
    ///
    /// Unknown ids become `#id` placeholder keys, so the request still reaches
    /// the permission gate and is then refused by role validation with
    /// `UnknownPermission { key: "#id" }`.
    pub fn keys_for_ids(&self, ids: &[PermissionId]) -> BTreeSet<PermissionKey> {
        ids.iter()
            .map(|&id| match self.lookup_id(id) {
                Some(permission) => permission.key.clone(),
                None => PermissionKey::new(id.to_string()),
            })
            .collect()
    }
}
