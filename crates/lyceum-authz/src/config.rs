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

//! Configuration for the RBAC engine

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Which permission checks are written to the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessAuditMode {
    /// Every decision, granted or denied
    All,
    /// Denials only; grants are traced at debug level
    DenialsOnly,
    /// Decisions are traced but never recorded
    Off,
}

impl AccessAuditMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "denials" | "denials_only" => Some(Self::DenialsOnly),
            "off" | "none" => Some(Self::Off),
            _ => None,
        }
    }

    pub fn records(&self, granted: bool) -> bool {
        match self {
            Self::All => true,
            Self::DenialsOnly => !granted,
            Self::Off => false,
        }
    }
}

/// Configuration for the RBAC engine
#[derive(Debug, Clone)]
pub struct RbacConfig {
    /// Seed the platform-wide system roles at startup
    pub seed_system_roles: bool,

    /// Maximum number of audit events kept in memory
    pub audit_capacity: usize,

    /// Authorization checks slower than this are logged as warnings
    pub slow_check_threshold: Duration,

    /// Optional JSON file with additional permission definitions
    pub catalog_path: Option<PathBuf>,

    /// Permission checks recorded in the audit log
    pub access_audit: AccessAuditMode,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            seed_system_roles: true,
            audit_capacity: 10_000,
            slow_check_threshold: Duration::from_millis(5),
            catalog_path: None,
            access_audit: AccessAuditMode::DenialsOnly,
        }
    }
}

impl RbacConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            seed_system_roles: env::var("LYCEUM_RBAC_SEED_SYSTEM_ROLES")
                .map(|v| v.parse().unwrap_or(defaults.seed_system_roles))
                .unwrap_or(defaults.seed_system_roles),

            audit_capacity: env::var("LYCEUM_RBAC_AUDIT_CAPACITY")
                .map(|v| v.parse().unwrap_or(defaults.audit_capacity))
                .unwrap_or(defaults.audit_capacity),

            slow_check_threshold: env::var("LYCEUM_RBAC_SLOW_CHECK_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.slow_check_threshold),

            catalog_path: env::var("LYCEUM_PERMISSION_CATALOG").ok().filter(|v| !v.trim().is_empty()).map(PathBuf::from),

            access_audit: env::var("LYCEUM_RBAC_ACCESS_AUDIT")
                .ok()
                .and_then(|v| AccessAuditMode::parse(&v))
                .unwrap_or(defaults.access_audit),
        }
    }

    /// Disable system role seeding (useful for tests that build their own roles)
    pub fn without_seed(mut self) -> Self {
        self.seed_system_roles = false;
        self
    }
}
