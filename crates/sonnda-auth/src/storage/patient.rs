//! Patient record ownership lookup.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{IdentityId, PatientId};

/// Resolves which identity owns a patient record.
#[async_trait]
pub trait PatientDirectory: Send + Sync {
    /// Returns the owning identity of `patient`, or `None` if the record
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn owner_of(&self, patient: PatientId) -> AuthResult<Option<IdentityId>>;
}
