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

//! Actor and institute identifiers, and the scope a role lives in

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier of an authenticated actor (user account)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier of an institute (tenant)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstituteId(String);

impl InstituteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstituteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstituteId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Organizational boundary of roles and assignments.
///
/// `Platform` is the global scope: platform-wide system roles live there and
/// platform operators hold their assignments there. Serialized as the
/// institute id, or `null` for the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Option<String>", into = "Option<String>")]
pub enum Scope {
    Platform,
    Institute(InstituteId),
}

impl Scope {
    pub fn institute(id: impl Into<String>) -> Self {
        Scope::Institute(InstituteId::new(id))
    }

    pub fn is_platform(&self) -> bool {
        matches!(self, Scope::Platform)
    }

    pub fn institute_id(&self) -> Option<&InstituteId> {
        match self {
            Scope::Platform => None,
            Scope::Institute(id) => Some(id),
        }
    }

    /// Whether a role owned by `owner` is visible to callers in this scope
    pub fn can_see(&self, owner: &Scope) -> bool {
        owner.is_platform() || owner == self
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Platform => f.write_str("platform"),
            Scope::Institute(id) => write!(f, "institute:{}", id),
        }
    }
}

/// An institute id that is present but blank
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("institute id must not be blank")]
pub struct BlankInstituteId;

/// `None` is the platform; a blank id is rejected rather than widened to it
impl TryFrom<Option<String>> for Scope {
    type Error = BlankInstituteId;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        match value {
            None => Ok(Scope::Platform),
            Some(id) if id.trim().is_empty() => Err(BlankInstituteId),
            Some(id) => Ok(Scope::Institute(InstituteId(id))),
        }
    }
}

impl From<Scope> for Option<String> {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Platform => None,
            Scope::Institute(id) => Some(id.0),
        }
    }
}
