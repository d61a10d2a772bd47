//! Registered identities.

use serde::Serialize;
use time::OffsetDateTime;

use super::{IdentityId, Role};

/// A registered account.
///
/// The password credential is an opaque PHC string and is never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    /// Store-assigned identifier.
    pub id: IdentityId,

    /// Unique, normalised email address.
    pub email: String,

    /// Argon2 PHC hash of the password.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Role assigned at registration.
    pub role: Role,

    /// When the identity was registered.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the identity was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// An identity that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: OffsetDateTime,
}

impl NewIdentity {
    /// Materialises the stored identity once the store assigned an id.
    #[must_use]
    pub fn into_identity(self, id: IdentityId) -> Identity {
        Identity {
            id,
            email: self.email,
            password_hash: self.password_hash,
            role: self.role,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}
