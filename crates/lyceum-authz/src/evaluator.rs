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

//! Permission evaluation against an actor's effective key set

use crate::catalog::PermissionKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A permission requirement: a single key, or every key of a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Requirement {
    One(PermissionKey),
    All(Vec<PermissionKey>),
}

impl Requirement {
    pub fn keys(&self) -> &[PermissionKey] {
        match self {
            Requirement::One(key) => std::slice::from_ref(key),
            Requirement::All(keys) => keys,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::One(key) => write!(f, "{}", key),
            Requirement::All(keys) => {
                let joined: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
                write!(f, "all of [{}]", joined.join(", "))
            }
        }
    }
}

impl From<&str> for Requirement {
    fn from(key: &str) -> Self {
        Requirement::One(PermissionKey::from(key))
    }
}

impl From<String> for Requirement {
    fn from(key: String) -> Self {
        Requirement::One(PermissionKey::from(key))
    }
}

impl From<PermissionKey> for Requirement {
    fn from(key: PermissionKey) -> Self {
        Requirement::One(key)
    }
}

impl From<&PermissionKey> for Requirement {
    fn from(key: &PermissionKey) -> Self {
        Requirement::One(key.clone())
    }
}

impl From<Vec<PermissionKey>> for Requirement {
    fn from(keys: Vec<PermissionKey>) -> Self {
        Requirement::All(keys)
    }
}

impl From<Vec<&str>> for Requirement {
    fn from(keys: Vec<&str>) -> Self {
        Requirement::All(keys.into_iter().map(PermissionKey::from).collect())
    }
}

impl From<&[&str]> for Requirement {
    fn from(keys: &[&str]) -> Self {
        Requirement::All(keys.iter().map(|key| PermissionKey::from(*key)).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Requirement {
    fn from(keys: [&str; N]) -> Self {
        Requirement::All(keys.into_iter().map(PermissionKey::from).collect())
    }
}

/// The permissions an actor holds in one scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermissions {
    keys: BTreeSet<PermissionKey>,
    full_access: bool,
}

impl EffectivePermissions {
    pub fn new(keys: BTreeSet<PermissionKey>, full_access: bool) -> Self {
        Self { keys, full_access }
    }

    /// Grants nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// Grants everything regardless of keys
    pub fn full(keys: BTreeSet<PermissionKey>) -> Self {
        Self::new(keys, true)
    }

    pub fn keys(&self) -> &BTreeSet<PermissionKey> {
        &self.keys
    }

    pub fn full_access(&self) -> bool {
        self.full_access
    }

    /// Check a single key or an AND-list of keys
    pub fn has_permission(&self, requirement: impl Into<Requirement>) -> bool {
        self.evaluate(&requirement.into())
    }

    pub fn evaluate(&self, requirement: &Requirement) -> bool {
        if self.full_access {
            return true;
        }

        // An empty AND-list is vacuously satisfied
        requirement.keys().iter().all(|key| self.keys.contains(key))
    }

    /// True if any listed key is held. An empty list is never satisfied without full access.
    pub fn has_any_permission<K: AsRef<str>>(&self, keys: &[K]) -> bool {
        if self.full_access {
            return true;
        }

        keys.iter().any(|key| self.keys.contains(key.as_ref()))
    }
}
