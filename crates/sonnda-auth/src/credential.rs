//! Credential management: registration, password verification and login.
//!
//! Passwords are hashed on tokio's blocking pool. No lock is held while a
//! hash is computed, so a slow hash only occupies its own request.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;

use crate::AuthResult;
use crate::audit::AuditLog;
use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password::PasswordHashing;
use crate::storage::{CredentialStore, bounded};
use crate::token::TokenService;
use crate::types::{Identity, IdentityId, NewIdentity, Role};

/// Upper bound on password length, to keep hashing cost bounded.
pub const MAX_PASSWORD_LEN: usize = 1024;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("Invalid email regex")
});

/// Hashed once at construction and verified against when an email is
/// unknown, so unknown emails cost the same as wrong passwords.
const UNKNOWN_IDENTITY_PASSWORD: &str = "sonnda-unknown-identity";

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub identity: Identity,
    pub access_token: String,
}

/// Registers identities and checks their passwords.
pub struct CredentialManager {
    store: Arc<dyn CredentialStore>,
    hashing: PasswordHashing,
    clock: Arc<dyn Clock>,
    audit: AuditLog,
    min_password_len: usize,
    store_timeout: Duration,
    dummy_hash: Arc<str>,
}

impl CredentialManager {
    /// Creates a credential manager.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the password hashing parameters
    /// are invalid, or `AuthError::Internal` if the hash used for unknown
    /// emails cannot be computed.
    ///
    /// Computes one password hash, so call it at startup rather than on a
    /// request path.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        config: &AuthConfig,
        clock: Arc<dyn Clock>,
    ) -> AuthResult<Self> {
        let hashing = PasswordHashing::new(&config.password)?;
        let dummy_hash = Arc::from(hashing.hash(UNKNOWN_IDENTITY_PASSWORD)?);
        Ok(Self {
            store,
            hashing,
            clock,
            audit: AuditLog::new(config.audit.clone()),
            min_password_len: config.password.min_length,
            store_timeout: config.storage.operation_timeout,
            dummy_hash,
        })
    }

    /// Registers a new identity.
    ///
    /// The email is trimmed and lower-cased before it is checked and stored.
    ///
    /// # Errors
    ///
    /// - `AuthError::Validation` naming the offending field
    /// - `AuthError::EmailTaken` if the email is registered, including when
    ///   a concurrent registration wins the insert
    /// - storage errors from the credential store
    pub async fn register(
        &self,
        email: &str,
        raw_password: &str,
        role: Role,
    ) -> AuthResult<Identity> {
        let email = normalize_email(email);
        validate_email(&email)?;
        self.validate_password(raw_password)?;

        let existing = bounded(
            self.store_timeout,
            "credential.find_by_email",
            self.store.find_by_email(&email),
        )
        .await?;
        if existing.is_some() {
            tracing::debug!("Registration rejected: email already registered");
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hash(raw_password).await?;
        let new_identity = NewIdentity {
            email,
            password_hash,
            role,
            created_at: self.clock.now(),
        };

        let identity = bounded(
            self.store_timeout,
            "credential.insert",
            self.store.insert(new_identity),
        )
        .await
        .map_err(|e| match e {
            AuthError::DuplicateKey { .. } => AuthError::EmailTaken,
            other => other,
        })?;

        self.audit.registered(&identity);
        Ok(identity)
    }

    /// Hashes a raw password on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if hashing fails or the blocking task
    /// is cancelled.
    pub async fn hash(&self, raw_password: &str) -> AuthResult<String> {
        let hashing = self.hashing.clone();
        let raw_password = raw_password.to_owned();
        tokio::task::spawn_blocking(move || hashing.hash(&raw_password))
            .await
            .map_err(|e| AuthError::internal(format!("password hashing task failed: {e}")))?
    }

    /// Verifies a raw password against a stored hash on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the blocking task is cancelled.
    pub async fn verify(&self, raw_password: &str, stored_hash: &str) -> AuthResult<bool> {
        let hashing = self.hashing.clone();
        let raw_password = raw_password.to_owned();
        let stored_hash = stored_hash.to_owned();
        tokio::task::spawn_blocking(move || hashing.verify(&raw_password, &stored_hash))
            .await
            .map_err(|e| AuthError::internal(format!("password verification task failed: {e}")))
    }

    /// Checks an email and password.
    ///
    /// An unknown email and a wrong password are indistinguishable to the
    /// caller: both return `InvalidCredentials`, and an unknown email still
    /// pays for one password verification.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on any mismatch, or a storage
    /// error from the credential store.
    pub async fn authenticate(&self, email: &str, raw_password: &str) -> AuthResult<Identity> {
        let email = normalize_email(email);
        let found = bounded(
            self.store_timeout,
            "credential.find_by_email",
            self.store.find_by_email(&email),
        )
        .await?;

        let Some(identity) = found else {
            self.verify_against_dummy(raw_password).await?;
            self.audit.login_failed(&email);
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify(raw_password, &identity.password_hash).await? {
            self.audit.login_failed(&email);
            return Err(AuthError::InvalidCredentials);
        }

        self.audit.login_succeeded(&identity);
        Ok(identity)
    }

    /// Authenticates and issues a session token.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`CredentialManager::authenticate`], or
    /// `AuthError::Internal` if the token cannot be signed.
    pub async fn login(
        &self,
        tokens: &TokenService,
        email: &str,
        raw_password: &str,
    ) -> AuthResult<LoginOutcome> {
        let identity = self.authenticate(email, raw_password).await?;
        let access_token = tokens
            .issue(&identity)
            .map_err(|e| AuthError::internal(format!("failed to issue token: {e}")))?;
        Ok(LoginOutcome {
            identity,
            access_token,
        })
    }

    /// Loads the identity behind an authenticated actor.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if the identity no longer exists.
    pub async fn profile(&self, id: IdentityId) -> AuthResult<Identity> {
        bounded(
            self.store_timeout,
            "credential.find_by_id",
            self.store.find_by_id(id),
        )
        .await?
        .ok_or_else(|| AuthError::not_found("identity", id))
    }

    fn validate_password(&self, raw_password: &str) -> AuthResult<()> {
        let len = raw_password.chars().count();
        if len < self.min_password_len {
            return Err(AuthError::validation(
                "password",
                format!("must be at least {} characters", self.min_password_len),
            ));
        }
        if len > MAX_PASSWORD_LEN {
            return Err(AuthError::validation(
                "password",
                format!("must be at most {MAX_PASSWORD_LEN} characters"),
            ));
        }
        Ok(())
    }

    async fn verify_against_dummy(&self, raw_password: &str) -> AuthResult<()> {
        let hashing = self.hashing.clone();
        let dummy = Arc::clone(&self.dummy_hash);
        let raw_password = raw_password.to_owned();
        tokio::task::spawn_blocking(move || {
            let _ = hashing.verify(&raw_password, &dummy);
        })
        .await
        .map_err(|e| AuthError::internal(format!("password verification task failed: {e}")))
    }
}

/// Trims and lower-cases an email address.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> AuthResult<()> {
    if email.is_empty() {
        return Err(AuthError::validation("email", "is required"));
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(AuthError::validation("email", "must be a valid email address"));
    }
    Ok(())
}
