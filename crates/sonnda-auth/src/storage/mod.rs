//! Storage traits for identity and authorization data.
//!
//! This module defines storage interfaces for:
//!
//! - Registered identities ([`CredentialStore`])
//! - Authorization grants and their history ([`GrantStore`])
//! - Patient record ownership ([`PatientDirectory`])
//!
//! # Implementations
//!
//! Storage implementations are provided in separate crates:
//!
//! - `sonnda-db-memory` - In-memory storage backend

pub mod credential;
pub mod grant;
pub mod patient;

use std::future::Future;
use std::time::Duration;

pub use credential::CredentialStore;
pub use grant::{GrantStore, GrantTransaction};
pub use patient::PatientDirectory;

use crate::AuthResult;
use crate::error::AuthError;

/// Runs a store call, failing with `AuthError::Timeout` if it takes longer
/// than `limit`.
///
/// The inner future is dropped on timeout. For grant transactions this
/// happens before `commit`, so nothing is applied.
pub(crate) async fn bounded<T, F>(limit: Duration, operation: &'static str, call: F) -> AuthResult<T>
where
    F: Future<Output = AuthResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "Store call timed out");
            Err(AuthError::timeout(operation))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let value = bounded(Duration::from_secs(1), "test.ok", async { Ok(5) })
            .await
            .unwrap();
        assert_eq!(value, 5);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: AuthResult<()> = bounded(Duration::from_millis(50), "test.slow", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(AuthError::Timeout { ref operation }) if operation == "test.slow"));
    }
}
