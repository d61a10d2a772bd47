//! Credential storage trait.
//!
//! Defines the interface for identity persistence operations.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{Identity, IdentityId, NewIdentity};

/// Storage for registered identities.
///
/// Implementations must enforce email uniqueness: of two concurrent inserts
/// with the same email, exactly one succeeds.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Finds an identity by its (normalised) email.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Identity>>;

    /// Finds an identity by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, id: IdentityId) -> AuthResult<Option<Identity>>;

    /// Inserts a new identity and returns it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DuplicateKey` if the email is already registered,
    /// or another error if the storage operation fails.
    async fn insert(&self, identity: NewIdentity) -> AuthResult<Identity>;
}
