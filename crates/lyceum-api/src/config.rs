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

//! Configuration management for the RBAC HTTP API

use lyceum_authz::RbacConfig;
use std::env;
use tracing::warn;

/// Configuration for the RBAC HTTP API
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server to
    pub bind_address: String,

    /// JWT secret key for authentication
    pub jwt_secret: String,

    /// Expected `iss` claim
    pub jwt_issuer: String,

    /// Expected `aud` claim
    pub jwt_audience: String,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Actor ids granted platform-wide full access at boot
    pub platform_superadmins: Vec<String>,

    /// `(actor, institute)` pairs granted full access within their institute at boot
    pub institute_owners: Vec<(String, String)>,

    /// Engine configuration
    pub rbac: RbacConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            jwt_secret: "default-secret-change-in-production".to_string(),
            jwt_issuer: "lyceum-auth".to_string(),
            jwt_audience: "lyceum".to_string(),
            max_body_size: 1024 * 1024, // 1MB
            platform_superadmins: Vec::new(),
            institute_owners: Vec::new(),
            rbac: RbacConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_address: env::var("LYCEUM_API_BIND_ADDRESS").unwrap_or(defaults.bind_address),

            jwt_secret: env::var("LYCEUM_API_JWT_SECRET").unwrap_or(defaults.jwt_secret),

            jwt_issuer: env::var("LYCEUM_API_JWT_ISSUER").unwrap_or(defaults.jwt_issuer),

            jwt_audience: env::var("LYCEUM_API_JWT_AUDIENCE").unwrap_or(defaults.jwt_audience),

            max_body_size: env::var("LYCEUM_API_MAX_BODY_SIZE")
                .map(|v| v.parse().unwrap_or(defaults.max_body_size))
                .unwrap_or(defaults.max_body_size),

            platform_superadmins: env::var("LYCEUM_API_PLATFORM_SUPERADMINS")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.platform_superadmins),

            institute_owners: env::var("LYCEUM_API_INSTITUTE_OWNERS")
                .map(|v| parse_owner_list(&v))
                .unwrap_or(defaults.institute_owners),

            rbac: RbacConfig::from_env(),
        }
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

/// Parse `actor:institute` entries; malformed ones are skipped with a warning
fn parse_owner_list(value: &str) -> Vec<(String, String)> {
    parse_list(value)
        .into_iter()
        .filter_map(|entry| match entry.split_once(':') {
            Some((actor, institute)) if !actor.trim().is_empty() && !institute.trim().is_empty() => Some((actor.trim().to_string(), institute.trim().to_string())),
            _ => {
                warn!(entry = %entry, "Ignoring malformed institute owner entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_superadmin_list() {
        assert_eq!(parse_list(" root, ops ,,"), vec!["root".to_string(), "ops".to_string()]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_parse_institute_owners() {
        let owners = parse_owner_list("alice:s1, bob : s2 ,broken,:s3,carol:");
        assert_eq!(owners, vec![("alice".to_string(), "s1".to_string()), ("bob".to_string(), "s2".to_string())]);
        assert!(parse_owner_list("").is_empty());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_body_size, 1024 * 1024);
        assert!(config.platform_superadmins.is_empty());
        assert!(config.institute_owners.is_empty());
        assert!(config.rbac.seed_system_roles);
    }
}
