//! Security event audit logging.
//!
//! This module provides audit logging for security events:
//!
//! - Registration and login (successful and failed)
//! - Rejected session tokens
//! - Access control decisions
//! - Grant requests and status transitions
//!
//! Events are emitted as structured `tracing` events under the
//! `sonnda_auth::audit` target, so a subscriber can route them separately
//! from ordinary diagnostics. Each family can be switched off through
//! [`AuditConfig`].

use crate::config::AuditConfig;
use crate::token::TokenError;
use crate::types::{Grant, HistoryEntry, Identity, IdentityId, PatientId, Role};

/// `tracing` target used for every audit event.
pub const AUDIT_TARGET: &str = "sonnda_auth::audit";

/// Emits audit events according to an [`AuditConfig`].
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    config: AuditConfig,
}

impl AuditLog {
    #[must_use]
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn registered(&self, identity: &Identity) {
        if self.config.log_successful_auth {
            tracing::info!(
                target: AUDIT_TARGET,
                event = "identity.registered",
                identity_id = %identity.id,
                role = %identity.role,
                "Identity registered"
            );
        }
    }

    pub fn login_succeeded(&self, identity: &Identity) {
        if self.config.log_successful_auth {
            tracing::info!(
                target: AUDIT_TARGET,
                event = "login.succeeded",
                identity_id = %identity.id,
                role = %identity.role,
                "Login succeeded"
            );
        }
    }

    pub fn login_failed(&self, email: &str) {
        if self.config.log_failed_auth {
            tracing::warn!(
                target: AUDIT_TARGET,
                event = "login.failed",
                email,
                "Login failed"
            );
        }
    }

    pub fn token_rejected(&self, error: &TokenError) {
        if self.config.log_failed_auth {
            tracing::warn!(
                target: AUDIT_TARGET,
                event = "token.rejected",
                error = %error,
                "Session token rejected"
            );
        }
    }

    pub fn access_allowed(&self, actor: IdentityId, role: Role, patient: Option<PatientId>) {
        if self.config.log_access_decisions {
            tracing::debug!(
                target: AUDIT_TARGET,
                event = "access.allowed",
                actor = %actor,
                role = %role,
                patient = ?patient.map(PatientId::get),
                "Access allowed"
            );
        }
    }

    pub fn access_denied(
        &self,
        actor: IdentityId,
        role: Role,
        patient: Option<PatientId>,
        reason: &str,
    ) {
        if self.config.log_access_decisions {
            tracing::warn!(
                target: AUDIT_TARGET,
                event = "access.denied",
                actor = %actor,
                role = %role,
                patient = ?patient.map(PatientId::get),
                reason,
                "Access denied"
            );
        }
    }

    pub fn grant_requested(&self, grant: &Grant) {
        if self.config.log_grant_changes {
            tracing::info!(
                target: AUDIT_TARGET,
                event = "grant.requested",
                grant_id = %grant.id,
                grantee = %grant.grantee,
                patient = %grant.patient,
                "Access requested"
            );
        }
    }

    pub fn grant_transitioned(&self, grant: &Grant, entry: &HistoryEntry) {
        if self.config.log_grant_changes {
            tracing::info!(
                target: AUDIT_TARGET,
                event = "grant.transitioned",
                grant_id = %grant.id,
                grantee = %grant.grantee,
                patient = %grant.patient,
                old_status = %entry.old_status,
                new_status = %entry.new_status,
                changed_by = %entry.changed_by,
                reason = entry.reason.as_deref().unwrap_or(""),
                "Grant status changed"
            );
        }
    }
}
