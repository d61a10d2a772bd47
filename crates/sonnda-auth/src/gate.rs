//! Access control gate.
//!
//! Every request that touches patient data goes through two steps:
//!
//! 1. [`AccessGate::authenticate`] turns a bearer token into an
//!    [`ActorContext`].
//! 2. [`AccessGate::authorize`] checks the actor against the endpoint's
//!    required roles and, when a patient record is targeted, against record
//!    ownership and the authorization ledger.
//!
//! ADMIN actors bypass ownership and grant checks. PATIENT actors may only
//! reach their own record. DOCTOR actors reach their own record, or another
//! record with an approved, unexpired grant.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::audit::AuditLog;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::ledger::AuthorizationLedger;
use crate::storage::{PatientDirectory, bounded};
use crate::token::{SessionClaims, TokenService};
use crate::types::{Grant, IdentityId, PatientId, Role};

/// Common role requirements.
pub mod roles {
    use crate::types::Role;

    /// Any authenticated actor.
    pub const ANY: &[Role] = &[];
    pub const ADMIN: &[Role] = &[Role::Admin];
    pub const DOCTOR: &[Role] = &[Role::Doctor];
    pub const PATIENT: &[Role] = &[Role::Patient];
    pub const DOCTOR_OR_ADMIN: &[Role] = &[Role::Doctor, Role::Admin];
    pub const PATIENT_OR_ADMIN: &[Role] = &[Role::Patient, Role::Admin];
}

/// The authenticated actor behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorContext {
    pub identity_id: IdentityId,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl ActorContext {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Returns `true` if `required` is empty or contains the actor's role.
    #[must_use]
    pub fn has_any_role(&self, required: &[Role]) -> bool {
        required.is_empty() || required.contains(&self.role)
    }
}

impl From<SessionClaims> for ActorContext {
    fn from(claims: SessionClaims) -> Self {
        Self {
            identity_id: claims.identity_id(),
            issued_at: claims.issued_at(),
            expires_at: claims.expires_at(),
            email: claims.email,
            role: claims.role,
        }
    }
}

/// A change to a grant's workflow that needs permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantAction {
    Approve,
    Revoke,
}

/// Authenticates and authorizes requests.
pub struct AccessGate {
    tokens: Arc<TokenService>,
    ledger: Arc<AuthorizationLedger>,
    patients: Arc<dyn PatientDirectory>,
    audit: AuditLog,
    store_timeout: Duration,
}

impl AccessGate {
    #[must_use]
    pub fn new(
        tokens: Arc<TokenService>,
        ledger: Arc<AuthorizationLedger>,
        patients: Arc<dyn PatientDirectory>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            tokens,
            ledger,
            patients,
            audit: AuditLog::new(config.audit.clone()),
            store_timeout: config.storage.operation_timeout,
        }
    }

    #[must_use]
    pub fn ledger(&self) -> &AuthorizationLedger {
        &self.ledger
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Verifies a raw session token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` for every verification failure.
    /// The specific reason is logged, not returned.
    pub fn authenticate(&self, raw_token: &str) -> AuthResult<ActorContext> {
        match self.tokens.verify(raw_token) {
            Ok(claims) => Ok(ActorContext::from(claims)),
            Err(e) => {
                self.audit.token_rejected(&e);
                Err(AuthError::unauthenticated("invalid or expired session token"))
            }
        }
    }

    /// Extracts the token from an `Authorization: Bearer <token>` header
    /// value and verifies it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` if the header is missing, is not
    /// a bearer header, or carries an invalid token.
    pub fn authenticate_header(&self, header: Option<&str>) -> AuthResult<ActorContext> {
        let header = header.ok_or_else(|| AuthError::unauthenticated("missing bearer token"))?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::unauthenticated("missing bearer token"))?;
        self.authenticate(token)
    }

    /// Decides whether `actor` may perform an action requiring one of
    /// `required` roles, optionally on the `target` patient record.
    ///
    /// Read-only: never changes ledger state.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Forbidden` when access is denied, or a storage
    /// error if ownership or grants cannot be looked up.
    pub async fn authorize(
        &self,
        actor: &ActorContext,
        required: &[Role],
        target: Option<PatientId>,
    ) -> AuthResult<()> {
        if !actor.has_any_role(required) {
            return Err(self.deny(actor, target, "role not permitted"));
        }

        let Some(patient) = target else {
            self.audit.access_allowed(actor.identity_id, actor.role, None);
            return Ok(());
        };

        match actor.role {
            Role::Admin => {}
            Role::Patient => {
                if !self.owns(actor, patient).await? {
                    return Err(self.deny(actor, target, "not the record owner"));
                }
            }
            Role::Doctor => {
                if !self.owns(actor, patient).await? {
                    let current = self
                        .ledger
                        .current_grant(actor.identity_id, patient)
                        .await?;
                    if !current.is_some_and(|c| c.is_active()) {
                        return Err(self.deny(actor, target, "no approved grant"));
                    }
                }
            }
        }

        self.audit
            .access_allowed(actor.identity_id, actor.role, target);
        Ok(())
    }

    /// Decides whether `actor` may approve or revoke `grant`.
    ///
    /// - ADMIN may do either.
    /// - The owner of the patient record may do either.
    /// - The grantee may revoke (withdraw) its own grant.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Forbidden` when the actor has no say over the
    /// grant, or a storage error if ownership cannot be looked up.
    pub async fn authorize_grant_change(
        &self,
        actor: &ActorContext,
        grant: &Grant,
        action: GrantAction,
    ) -> AuthResult<()> {
        let target = Some(grant.patient);
        let allowed = actor.is_admin()
            || (action == GrantAction::Revoke && grant.grantee == actor.identity_id)
            || self.owns(actor, grant.patient).await?;

        if !allowed {
            return Err(self.deny(actor, target, "no authority over this grant"));
        }
        self.audit
            .access_allowed(actor.identity_id, actor.role, target);
        Ok(())
    }

    async fn owns(&self, actor: &ActorContext, patient: PatientId) -> AuthResult<bool> {
        let owner = bounded(
            self.store_timeout,
            "patient.owner_of",
            self.patients.owner_of(patient),
        )
        .await?;
        Ok(owner == Some(actor.identity_id))
    }

    fn deny(&self, actor: &ActorContext, target: Option<PatientId>, reason: &str) -> AuthError {
        self.audit
            .access_denied(actor.identity_id, actor.role, target, reason);
        AuthError::forbidden(reason)
    }
}
