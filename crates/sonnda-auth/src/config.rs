//! Authentication and authorization configuration.
//!
//! All sections use `#[serde(default)]`, so a configuration file only needs
//! to name the values it overrides. Durations accept humantime strings
//! (`"24h"`, `"30d"`, `"500ms"`).
//!
//! ```toml
//! issuer = "sonnda-api"
//! signing_secret = "change-me-to-at-least-32-bytes-of-entropy"
//!
//! [token]
//! ttl = "24h"
//!
//! [ledger]
//! approval_ttl = "30d"
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Default token issuer.
pub const DEFAULT_ISSUER: &str = "sonnda-api";

/// Minimum accepted signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted session token lifetime.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(366 * 86_400);

/// Longest accepted approval window. Disable expiry with an absent
/// `ledger.approval_ttl` instead of a huge value.
pub const MAX_APPROVAL_TTL: Duration = Duration::from_secs(100 * 365 * 86_400);

/// Environment variable prefix for overrides, e.g. `SONNDA__TOKEN__TTL=1h`.
pub const ENV_PREFIX: &str = "SONNDA";

/// Plain environment variable consulted for the signing secret when the
/// layered configuration leaves it empty.
pub const SECRET_ENV_VAR: &str = "JWT_SECRET";

/// Main authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer written into and required from every session token.
    pub issuer: String,

    /// HS256 signing secret.
    #[serde(skip_serializing)]
    pub signing_secret: SigningSecret,

    /// Session token settings.
    pub token: TokenConfig,

    /// Password policy and hashing cost.
    pub password: PasswordConfig,

    /// Authorization ledger settings.
    pub ledger: LedgerConfig,

    /// Store call bounds.
    pub storage: StorageConfig,

    /// Audit logging settings.
    pub audit: AuditConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            signing_secret: SigningSecret::default(),
            token: TokenConfig::default(),
            password: PasswordConfig::default(),
            ledger: LedgerConfig::default(),
            storage: StorageConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

/// The token signing secret. Never printed.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SigningSecret(String);

impl SigningSecret {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the raw secret bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret([redacted])")
    }
}

/// Session token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Lifetime of an issued token.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 3600),
        }
    }
}

/// Password policy and Argon2id cost parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PasswordConfig {
    /// Minimum password length in characters.
    pub min_length: usize,

    /// Argon2 memory cost in KiB.
    pub memory_kib: u32,

    /// Argon2 iteration count.
    pub iterations: u32,

    /// Argon2 degree of parallelism.
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 6,
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Authorization ledger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// How long an approval stays effective. `None` disables expiry.
    #[serde(with = "humantime_serde")]
    pub approval_ttl: Option<Duration>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            approval_ttl: Some(Duration::from_secs(30 * 24 * 3600)),
        }
    }
}

/// Bounds applied to every store call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Maximum time a single store call may take.
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(5),
        }
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Log successful registrations and logins.
    pub log_successful_auth: bool,

    /// Log failed logins and rejected tokens.
    pub log_failed_auth: bool,

    /// Log access control decisions.
    pub log_access_decisions: bool,

    /// Log grant requests and status transitions.
    pub log_grant_changes: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_successful_auth: true,
            log_failed_auth: true,
            log_access_decisions: true,
            log_grant_changes: true,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration sources could not be read or merged.
    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl AuthConfig {
    /// Loads configuration from an optional TOML file, then `SONNDA__*`
    /// environment overrides, then validates it.
    ///
    /// If no signing secret is configured, `JWT_SECRET` is used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if a source cannot be parsed, and the
    /// errors of [`AuthConfig::validate`] otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        // Environment variable overrides, e.g., SONNDA__LEDGER__APPROVAL_TTL=7d
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .separator("__"),
        );

        let mut merged: AuthConfig = builder
            .build()
            .and_then(|cfg| cfg.try_deserialize::<AuthConfig>())
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        if merged.signing_secret.is_empty() {
            if let Ok(secret) = std::env::var(SECRET_ENV_VAR) {
                merged.signing_secret = SigningSecret::new(secret);
            }
        }

        merged.validate()?;
        Ok(merged)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no signing secret is set, and
    /// `ConfigError::InvalidValue` if:
    /// - The issuer is empty
    /// - The signing secret is shorter than [`MIN_SECRET_LEN`] bytes
    /// - Any lifetime or timeout is zero
    /// - The Argon2 parameters are out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        if self.signing_secret.is_empty() {
            return Err(ConfigError::Missing("signing_secret".to_string()));
        }
        if self.signing_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue(format!(
                "signing_secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        if self.token.ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "token.ttl must be greater than zero".to_string(),
            ));
        }

        if self.token.ttl > MAX_TOKEN_TTL {
            return Err(ConfigError::InvalidValue(format!(
                "token.ttl must be at most {} days",
                MAX_TOKEN_TTL.as_secs() / 86_400
            )));
        }

        if self.ledger.approval_ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(ConfigError::InvalidValue(
                "ledger.approval_ttl must be greater than zero when set".to_string(),
            ));
        }
        if self.ledger.approval_ttl.is_some_and(|ttl| ttl > MAX_APPROVAL_TTL) {
            return Err(ConfigError::InvalidValue(format!(
                "ledger.approval_ttl must be at most {} days; leave it unset to disable expiry",
                MAX_APPROVAL_TTL.as_secs() / 86_400
            )));
        }

        if self.storage.operation_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "storage.operation_timeout must be greater than zero".to_string(),
            ));
        }

        self.password.validate()
    }
}

impl PasswordConfig {
    /// Validates the password policy and hashing cost.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a parameter is out of the
    /// range Argon2 accepts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_length == 0 {
            return Err(ConfigError::InvalidValue(
                "password.min_length must be at least 1".to_string(),
            ));
        }
        if self.iterations == 0 || self.parallelism == 0 {
            return Err(ConfigError::InvalidValue(
                "password.iterations and password.parallelism must be at least 1".to_string(),
            ));
        }
        if self.memory_kib < 8 * self.parallelism {
            return Err(ConfigError::InvalidValue(format!(
                "password.memory_kib must be at least {} for parallelism {}",
                8 * self.parallelism,
                self.parallelism
            )));
        }
        Ok(())
    }
}
