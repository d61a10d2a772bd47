//! Actor roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of roles an identity can hold.
///
/// Roles are validated on every ingestion: deserialization and parsing
/// reject anything outside this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// A patient; may only access their own record.
    Patient,
    /// A doctor; needs an approved grant to access another patient's record.
    Doctor,
    /// An administrator; bypasses ownership and grant checks.
    Admin,
}

impl Role {
    /// All roles, in declaration order.
    pub const ALL: [Role; 3] = [Role::Patient, Role::Doctor, Role::Admin];

    /// Returns the wire name of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "PATIENT",
            Self::Doctor => "DOCTOR",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PATIENT" => Ok(Self::Patient),
            "DOCTOR" => Ok(Self::Doctor),
            "ADMIN" => Ok(Self::Admin),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}
