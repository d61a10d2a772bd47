//! # sonnda-auth
//!
//! Identity and access-authorization core for the Sonnda clinical records API.
//!
//! This crate provides:
//! - Credential registration and password authentication (Argon2id)
//! - Stateless HS256 session tokens carrying identity and role claims
//! - The doctor-patient authorization ledger with its append-only history
//! - The access control gate deciding who may touch a patient's record
//! - Audit logging for security events
//!
//! ## Overview
//!
//! Requests arrive either without credentials (register, login) or with a
//! bearer token. The [`gate::AccessGate`] verifies the token into an
//! [`gate::ActorContext`] and, for operations on a patient's record, consults
//! the [`ledger::AuthorizationLedger`] for an approved grant.
//!
//! Persistence lives behind the traits in [`storage`]; the
//! `sonnda-db-memory` crate provides an in-memory backend.
//!
//! ## Modules
//!
//! - [`config`] - Configuration and loading
//! - [`credential`] - Registration, password verification, login
//! - [`token`] - Session token issuing and verification
//! - [`ledger`] - Authorization grant state machine and history
//! - [`gate`] - Authentication and authorization of requests
//! - [`middleware`] - Axum extractors and error responses
//! - [`audit`] - Security event audit logging
//! - [`storage`] - Storage traits for identities, grants and patients

pub mod audit;
pub mod clock;
pub mod config;
pub mod credential;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod middleware;
pub mod password;
pub mod storage;
pub mod token;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuthConfig, ConfigError};
pub use credential::{CredentialManager, LoginOutcome};
pub use error::{AuthError, ErrorCategory};
pub use gate::{AccessGate, ActorContext, GrantAction};
pub use ledger::{AuthorizationLedger, CurrentGrant};
pub use middleware::{Actor, AdminActor, GateState};
pub use storage::{CredentialStore, GrantStore, GrantTransaction, PatientDirectory};
pub use token::{SessionClaims, TokenError, TokenService};
pub use types::{
    Grant, GrantId, GrantStatus, HistoryEntry, HistoryEntryId, Identity, IdentityId, PatientId,
    Role,
};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use sonnda_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::credential::{CredentialManager, LoginOutcome};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::gate::{AccessGate, ActorContext, GrantAction};
    pub use crate::ledger::{AuthorizationLedger, CurrentGrant};
    pub use crate::middleware::{Actor, AdminActor, GateState};
    pub use crate::storage::{CredentialStore, GrantStore, GrantTransaction, PatientDirectory};
    pub use crate::token::{SessionClaims, TokenError, TokenService};
    pub use crate::types::{
        Grant, GrantId, GrantStatus, HistoryEntry, HistoryEntryId, Identity, IdentityId,
        PatientId, Role,
    };
}
