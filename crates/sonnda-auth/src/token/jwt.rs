//! JWT encoding and decoding.
//!
//! Only HS256 is accepted. A token whose header names any other algorithm
//! is rejected before its signature is checked.
//!
//! Expiry is not checked here: [`super::TokenService`] compares `exp`
//! against its injected clock with zero leeway.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// The only signing algorithm issued and accepted.
pub const ALGORITHM: Algorithm = Algorithm::HS256;

/// Errors that can occur while encoding or verifying a token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The token is not a well-formed JWT or its claims do not parse.
    #[error("Malformed token: {message}")]
    Malformed {
        /// Description of what is malformed.
        message: String,
    },

    /// The signature does not verify, or the algorithm is not HS256.
    #[error("Invalid signature")]
    BadSignature,

    /// The token's expiry instant has been reached.
    #[error("Token expired")]
    Expired,

    /// The token was issued by someone else.
    #[error("Issuer mismatch")]
    IssuerMismatch,

    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },
}

impl TokenError {
    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a new `Encoding` error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => Self::BadSignature,
            ErrorKind::InvalidIssuer => Self::IssuerMismatch,
            _ => Self::malformed(err.to_string()),
        }
    }
}

/// HS256 codec bound to one secret and one issuer.
#[derive(Clone)]
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtCodec {
    /// Creates a codec for `secret` that requires `issuer` on decode.
    #[must_use]
    pub fn new(secret: &[u8], issuer: &str) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Signs `claims` into a compact JWT.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if the claims cannot be serialized.
    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| TokenError::encoding(e.to_string()))
    }

    /// Verifies signature, algorithm and issuer, then deserializes claims.
    ///
    /// # Errors
    ///
    /// Returns the [`TokenError`] describing the first check that failed.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        Ok(decode::<T>(token, &self.decoding_key, &self.validation)?.claims)
    }
}
