//! Password hashing and verification.
//!
//! # Security
//!
//! - Hashing uses Argon2id (hybrid mode) with configurable cost
//! - Salts are generated using OsRng (cryptographically secure RNG)
//! - Hashes are stored as PHC strings, which carry their own parameters,
//!   so raising the cost later does not invalidate existing hashes
//!
//! # Example
//!
//! ```
//! use sonnda_auth::config::PasswordConfig;
//! use sonnda_auth::password::PasswordHashing;
//!
//! let hashing = PasswordHashing::new(&PasswordConfig {
//!     memory_kib: 64,
//!     iterations: 1,
//!     ..PasswordConfig::default()
//! })
//! .unwrap();
//!
//! let hash = hashing.hash("correct horse").unwrap();
//! assert!(hashing.verify("correct horse", &hash));
//! assert!(!hashing.verify("battery staple", &hash));
//! ```

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::config::PasswordConfig;
use crate::error::AuthError;

/// Argon2id hasher configured with the deployment's cost parameters.
///
/// Hashing is CPU and memory heavy. Async callers should run it on the
/// blocking pool (see [`crate::credential::CredentialManager`]).
#[derive(Clone)]
pub struct PasswordHashing {
    argon2: Argon2<'static>,
}

impl PasswordHashing {
    /// Creates a hasher from the password configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if Argon2 rejects the parameters.
    pub fn new(config: &PasswordConfig) -> Result<Self, AuthError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| AuthError::configuration(format!("invalid argon2 parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hashes a raw password into a PHC string with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if hashing fails (rare).
    pub fn hash(&self, raw_password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(raw_password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))
    }

    /// Verifies a raw password against a stored PHC string.
    ///
    /// Comparison is constant-time. A stored value that is not a valid PHC
    /// string never verifies.
    #[must_use]
    pub fn verify(&self, raw_password: &str, stored_hash: &str) -> bool {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is not a valid PHC string");
                return false;
            }
        };
        self.argon2
            .verify_password(raw_password.as_bytes(), &parsed)
            .is_ok()
    }
}
