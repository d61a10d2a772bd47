//! Authorization grants and their history.
//!
//! A grant records a doctor's (the grantee's) access to one patient record.
//! Its status moves along a fixed graph:
//!
//! ```text
//! PENDING ──approve──▶ APPROVED ──revoke──▶ REVOKED
//!    │                    │
//!    └──────revoke────────┼───────────────▶ REVOKED
//!                         └──window elapsed─▶ EXPIRED
//! ```
//!
//! REVOKED and EXPIRED are terminal.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{GrantId, HistoryEntryId, IdentityId, PatientId};

/// Lifecycle status of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GrantStatus {
    Pending,
    Approved,
    Revoked,
    Expired,
}

impl GrantStatus {
    /// Returns `true` if the graph has an edge from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: GrantStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Revoked)
                | (Self::Approved, Self::Revoked)
                | (Self::Approved, Self::Expired)
        )
    }

    /// Returns `true` for statuses with no outgoing transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Revoked | Self::Expired)
    }

    /// Returns the wire name of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Revoked => "REVOKED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A doctor's access authorization to a patient record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub id: GrantId,
    /// Identity the access is granted to.
    pub grantee: IdentityId,
    /// Patient record the access applies to.
    pub patient: PatientId,
    /// Persisted status. See [`Grant::effective_status`] for the status
    /// access decisions use.
    pub status: GrantStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub requested_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub approved_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub revoked_at: Option<OffsetDateTime>,
}

impl Grant {
    /// Status after applying the approval window at `now`.
    ///
    /// An APPROVED grant whose approval is at least `approval_ttl` old reads
    /// as EXPIRED even if the store still holds APPROVED. A window that ends
    /// past the representable date range never elapses.
    #[must_use]
    pub fn effective_status(
        &self,
        now: OffsetDateTime,
        approval_ttl: Option<Duration>,
    ) -> GrantStatus {
        match (self.status, self.approved_at, approval_ttl) {
            (GrantStatus::Approved, Some(approved_at), Some(ttl))
                if window_end(approved_at, ttl).is_some_and(|end| end <= now) =>
            {
                GrantStatus::Expired
            }
            (status, _, _) => status,
        }
    }

    /// Returns this grant with `status` applied and its timestamp recorded.
    #[must_use]
    pub fn with_status(mut self, status: GrantStatus, at: OffsetDateTime) -> Self {
        self.status = status;
        match status {
            GrantStatus::Approved => self.approved_at = Some(at),
            GrantStatus::Revoked => self.revoked_at = Some(at),
            GrantStatus::Pending | GrantStatus::Expired => {}
        }
        self
    }
}

fn window_end(start: OffsetDateTime, ttl: Duration) -> Option<OffsetDateTime> {
    time::Duration::try_from(ttl)
        .ok()
        .and_then(|ttl| start.checked_add(ttl))
}

/// A grant that has not been persisted yet. Always starts PENDING.
#[derive(Debug, Clone)]
pub struct NewGrant {
    pub grantee: IdentityId,
    pub patient: PatientId,
    pub requested_at: OffsetDateTime,
}

impl NewGrant {
    #[must_use]
    pub fn into_grant(self, id: GrantId) -> Grant {
        Grant {
            id,
            grantee: self.grantee,
            patient: self.patient,
            status: GrantStatus::Pending,
            requested_at: self.requested_at,
            approved_at: None,
            revoked_at: None,
        }
    }
}

/// One recorded status transition of a grant. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: HistoryEntryId,
    pub grant_id: GrantId,
    pub old_status: GrantStatus,
    pub new_status: GrantStatus,
    /// Identity that caused the transition.
    pub changed_by: IdentityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub changed_at: OffsetDateTime,
}

/// A history entry that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub grant_id: GrantId,
    pub old_status: GrantStatus,
    pub new_status: GrantStatus,
    pub changed_by: IdentityId,
    pub reason: Option<String>,
    pub changed_at: OffsetDateTime,
}

impl NewHistoryEntry {
    #[must_use]
    pub fn into_entry(self, id: HistoryEntryId) -> HistoryEntry {
        HistoryEntry {
            id,
            grant_id: self.grant_id,
            old_status: self.old_status,
            new_status: self.new_status,
            changed_by: self.changed_by,
            reason: self.reason,
            changed_at: self.changed_at,
        }
    }
}
