//! Grant storage traits.
//!
//! Status changes and their history entries are written through a
//! [`GrantTransaction`], so a grant's status and its history can never
//! disagree.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::types::{
    Grant, GrantId, GrantStatus, HistoryEntry, IdentityId, NewGrant, NewHistoryEntry, PatientId,
};

/// Storage for authorization grants and their history.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Inserts a new PENDING grant and returns it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn insert(&self, grant: NewGrant) -> AuthResult<Grant>;

    /// Finds a grant by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, id: GrantId) -> AuthResult<Option<Grant>>;

    /// Returns the most recently requested grant for the pair.
    ///
    /// Ties on `requested_at` go to the larger id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_most_recent(
        &self,
        grantee: IdentityId,
        patient: PatientId,
    ) -> AuthResult<Option<Grant>>;

    /// Lists every grant on a patient record, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_for_patient(&self, patient: PatientId) -> AuthResult<Vec<Grant>>;

    /// Lists the history of a grant, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_history(&self, grant_id: GrantId) -> AuthResult<Vec<HistoryEntry>>;

    /// Starts a transaction for a status change.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn begin(&self) -> AuthResult<Box<dyn GrantTransaction>>;
}

/// A unit of work over grant status and history.
///
/// Nothing is visible to other readers until [`GrantTransaction::commit`]
/// succeeds. Dropping the transaction without committing discards it.
#[async_trait]
pub trait GrantTransaction: Send {
    /// Reads a grant inside the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_for_update(&mut self, id: GrantId) -> AuthResult<Option<Grant>>;

    /// Sets the status of a grant, provided its current status is `expected`.
    ///
    /// Records `at` as `approved_at` or `revoked_at` as appropriate.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Conflict` if the stored status is not `expected`,
    /// `AuthError::NotFound` if the grant does not exist, or another error
    /// if the storage operation fails.
    async fn update_status(
        &mut self,
        id: GrantId,
        expected: GrantStatus,
        new_status: GrantStatus,
        at: OffsetDateTime,
    ) -> AuthResult<Grant>;

    /// Appends a history entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn insert_history(&mut self, entry: NewHistoryEntry) -> AuthResult<HistoryEntry>;

    /// Makes every change in this transaction visible at once.
    ///
    /// # Errors
    ///
    /// Returns an error if the changes could not be applied, in which case
    /// none of them are.
    async fn commit(self: Box<Self>) -> AuthResult<()>;
}
