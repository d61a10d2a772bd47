//! Authorization ledger.
//!
//! Owns the doctor-patient grant workflow:
//!
//! - [`AuthorizationLedger::request_access`] creates a PENDING grant
//! - [`AuthorizationLedger::approve`] moves PENDING to APPROVED
//! - [`AuthorizationLedger::revoke`] moves PENDING or APPROVED to REVOKED
//! - [`AuthorizationLedger::expire`] persists APPROVED to EXPIRED once the
//!   approval window has elapsed
//!
//! Every transition writes exactly one history entry in the same store
//! transaction as the status change. An illegal transition writes nothing.
//!
//! Expiry is evaluated when a grant is read: an APPROVED grant past its
//! window is reported as EXPIRED by [`AuthorizationLedger::current_grant`]
//! whether or not `expire` has been called. A mutating call that finds a
//! lapsed approval persists the expiry before refusing the change.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::audit::AuditLog;
use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::storage::{GrantStore, GrantTransaction, bounded};
use crate::types::{
    Grant, GrantId, GrantStatus, HistoryEntry, IdentityId, NewGrant, NewHistoryEntry, PatientId,
};

/// History reason recorded when an approval window lapses.
pub const EXPIRY_REASON: &str = "approval window elapsed";

/// A grant together with the status access decisions should use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentGrant {
    pub grant: Grant,
    /// Status after the approval window is applied.
    pub effective_status: GrantStatus,
}

impl CurrentGrant {
    /// Returns `true` if the grant currently allows access.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.effective_status == GrantStatus::Approved
    }
}

/// The grant state machine and its history.
pub struct AuthorizationLedger {
    store: Arc<dyn GrantStore>,
    clock: Arc<dyn Clock>,
    approval_ttl: Option<Duration>,
    store_timeout: Duration,
    audit: AuditLog,
}

impl AuthorizationLedger {
    #[must_use]
    pub fn new(store: Arc<dyn GrantStore>, config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            approval_ttl: config.ledger.approval_ttl,
            store_timeout: config.storage.operation_timeout,
            audit: AuditLog::new(config.audit.clone()),
        }
    }

    /// How long an approval stays effective, if it expires at all.
    #[must_use]
    pub fn approval_ttl(&self) -> Option<Duration> {
        self.approval_ttl
    }

    /// Creates a PENDING grant for `grantee` on `patient`.
    ///
    /// Earlier grants for the same pair are left as they are; the new one
    /// becomes the current grant for the pair.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the grant cannot be inserted.
    pub async fn request_access(
        &self,
        grantee: IdentityId,
        patient: PatientId,
        requested_at: OffsetDateTime,
    ) -> AuthResult<Grant> {
        let previous = bounded(
            self.store_timeout,
            "grant.find_most_recent",
            self.store.find_most_recent(grantee, patient),
        )
        .await?;
        if let Some(previous) = previous {
            let status = previous.effective_status(requested_at, self.approval_ttl);
            if !status.is_terminal() {
                tracing::debug!(
                    grant_id = %previous.id,
                    status = %status,
                    "New access request supersedes a live grant"
                );
            }
        }

        let grant = bounded(
            self.store_timeout,
            "grant.insert",
            self.store.insert(NewGrant {
                grantee,
                patient,
                requested_at,
            }),
        )
        .await?;

        self.audit.grant_requested(&grant);
        Ok(grant)
    }

    /// Approves a PENDING grant.
    ///
    /// # Errors
    ///
    /// - `AuthError::NotFound` if the grant does not exist
    /// - `AuthError::InvalidTransition` if the grant is not PENDING,
    ///   including when a concurrent approval got there first
    pub async fn approve(
        &self,
        grant_id: GrantId,
        approver: IdentityId,
        now: OffsetDateTime,
    ) -> AuthResult<Grant> {
        self.transition(grant_id, GrantStatus::Approved, approver, None, now)
            .await
    }

    /// Revokes a PENDING or APPROVED grant.
    ///
    /// A PENDING grant revoked this way was declined or withdrawn before
    /// approval. An APPROVED grant whose window has elapsed is already
    /// expired and cannot be revoked.
    ///
    /// # Errors
    ///
    /// - `AuthError::NotFound` if the grant does not exist
    /// - `AuthError::InvalidTransition` if the grant is REVOKED or EXPIRED
    pub async fn revoke(
        &self,
        grant_id: GrantId,
        revoker: IdentityId,
        reason: Option<&str>,
        now: OffsetDateTime,
    ) -> AuthResult<Grant> {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(ToOwned::to_owned);
        self.transition(grant_id, GrantStatus::Revoked, revoker, reason, now)
            .await
    }

    /// Persists the expiry of an APPROVED grant whose window has elapsed.
    ///
    /// Access decisions never depend on this call.
    ///
    /// # Errors
    ///
    /// - `AuthError::NotFound` if the grant does not exist
    /// - `AuthError::InvalidTransition` if the grant is not APPROVED or its
    ///   window has not elapsed at `now`
    pub async fn expire(
        &self,
        grant_id: GrantId,
        actor: IdentityId,
        now: OffsetDateTime,
    ) -> AuthResult<Grant> {
        self.transition(
            grant_id,
            GrantStatus::Expired,
            actor,
            Some(EXPIRY_REASON.to_string()),
            now,
        )
        .await
    }

    /// Returns the current grant for the pair with expiry applied.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    pub async fn current_grant(
        &self,
        grantee: IdentityId,
        patient: PatientId,
    ) -> AuthResult<Option<CurrentGrant>> {
        let grant = bounded(
            self.store_timeout,
            "grant.find_most_recent",
            self.store.find_most_recent(grantee, patient),
        )
        .await?;
        let now = self.clock.now();
        Ok(grant.map(|grant| self.with_effective_status(grant, now)))
    }

    /// Looks up a single grant with expiry applied.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if the grant does not exist.
    pub async fn grant(&self, grant_id: GrantId) -> AuthResult<CurrentGrant> {
        let grant = bounded(
            self.store_timeout,
            "grant.find_by_id",
            self.store.find_by_id(grant_id),
        )
        .await?
        .ok_or_else(|| AuthError::not_found("grant", grant_id))?;
        Ok(self.with_effective_status(grant, self.clock.now()))
    }

    /// Lists the grants on a patient record, most recent first, with
    /// expiry applied.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    pub async fn grants_for_patient(&self, patient: PatientId) -> AuthResult<Vec<CurrentGrant>> {
        let grants = bounded(
            self.store_timeout,
            "grant.list_for_patient",
            self.store.list_for_patient(patient),
        )
        .await?;
        let now = self.clock.now();
        Ok(grants
            .into_iter()
            .map(|grant| self.with_effective_status(grant, now))
            .collect())
    }

    /// Returns the history of a grant, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if the grant does not exist.
    pub async fn history(&self, grant_id: GrantId) -> AuthResult<Vec<HistoryEntry>> {
        let exists = bounded(
            self.store_timeout,
            "grant.find_by_id",
            self.store.find_by_id(grant_id),
        )
        .await?
        .is_some();
        if !exists {
            return Err(AuthError::not_found("grant", grant_id));
        }

        bounded(
            self.store_timeout,
            "grant.list_history",
            self.store.list_history(grant_id),
        )
        .await
    }

    fn with_effective_status(&self, grant: Grant, now: OffsetDateTime) -> CurrentGrant {
        let effective_status = grant.effective_status(now, self.approval_ttl);
        CurrentGrant {
            grant,
            effective_status,
        }
    }

    async fn transition(
        &self,
        grant_id: GrantId,
        target: GrantStatus,
        actor: IdentityId,
        reason: Option<String>,
        now: OffsetDateTime,
    ) -> AuthResult<Grant> {
        let timeout = self.store_timeout;
        let mut tx = bounded(timeout, "grant.begin", self.store.begin()).await?;

        let current = bounded(timeout, "grant.find_for_update", tx.find_for_update(grant_id))
            .await?
            .ok_or_else(|| AuthError::not_found("grant", grant_id))?;

        let effective = current.effective_status(now, self.approval_ttl);
        let lapsed = current.status == GrantStatus::Approved && effective == GrantStatus::Expired;

        if target == GrantStatus::Expired {
            // Only an approval whose window has elapsed may be expired.
            if !lapsed {
                return Err(self.reject(grant_id, current.status, target));
            }
        } else if lapsed {
            // The stored row catches up with the window before the change is refused.
            let persisted = self
                .apply(
                    tx,
                    &current,
                    GrantStatus::Expired,
                    actor,
                    Some(EXPIRY_REASON.to_string()),
                    now,
                )
                .await;
            match persisted {
                Ok((expired, entry)) => self.audit.grant_transitioned(&expired, &entry),
                Err(AuthError::Conflict { .. }) => {}
                Err(e) => return Err(e),
            }
            return Err(self.reject(grant_id, GrantStatus::Expired, target));
        } else if !effective.can_transition_to(target) {
            return Err(self.reject(grant_id, effective, target));
        }

        let (updated, entry) = self
            .apply(tx, &current, target, actor, reason, now)
            .await
            .map_err(|e| conflict_as(e, effective, target))?;

        self.audit.grant_transitioned(&updated, &entry);
        Ok(updated)
    }

    /// Writes one status change and its history entry, then commits.
    async fn apply(
        &self,
        mut tx: Box<dyn GrantTransaction>,
        current: &Grant,
        target: GrantStatus,
        actor: IdentityId,
        reason: Option<String>,
        now: OffsetDateTime,
    ) -> AuthResult<(Grant, HistoryEntry)> {
        let timeout = self.store_timeout;
        let updated = bounded(
            timeout,
            "grant.update_status",
            tx.update_status(current.id, current.status, target, now),
        )
        .await?;

        let entry = bounded(
            timeout,
            "grant.insert_history",
            tx.insert_history(NewHistoryEntry {
                grant_id: current.id,
                old_status: current.status,
                new_status: target,
                changed_by: actor,
                reason,
                changed_at: now,
            }),
        )
        .await?;

        bounded(timeout, "grant.commit", tx.commit()).await?;
        Ok((updated, entry))
    }

    fn reject(&self, grant_id: GrantId, from: GrantStatus, to: GrantStatus) -> AuthError {
        tracing::debug!(
            grant_id = %grant_id,
            from = %from,
            to = %to,
            "Rejected grant transition"
        );
        AuthError::invalid_transition(from, to)
    }
}

/// A concurrent writer changed the grant first.
fn conflict_as(err: AuthError, from: GrantStatus, to: GrantStatus) -> AuthError {
    match err {
        AuthError::Conflict { .. } => AuthError::invalid_transition(from, to),
        other => other,
    }
}
