//! Session token service.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::jwt::{JwtCodec, TokenError};
use crate::clock::Clock;
use crate::config::{AuthConfig, MIN_SECRET_LEN};
use crate::error::AuthError;
use crate::types::{Identity, IdentityId, Role};

/// Supplies the signing secret and issuer when a [`TokenService`] is built.
///
/// The values are read once; the service keeps its own immutable copy.
pub trait SecretProvider {
    fn signing_secret(&self) -> &[u8];
    fn issuer(&self) -> &str;
}

impl SecretProvider for AuthConfig {
    fn signing_secret(&self) -> &[u8] {
        self.signing_secret.expose()
    }

    fn issuer(&self) -> &str {
        &self.issuer
    }
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the identity id as a string.
    pub sub: String,
    /// The identity id.
    pub uid: IdentityId,
    pub email: String,
    pub role: Role,
    pub iss: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl SessionClaims {
    #[must_use]
    pub fn identity_id(&self) -> IdentityId {
        self.uid
    }

    #[must_use]
    pub fn issued_at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.iat).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.exp).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}

/// Mints and verifies session tokens.
///
/// Stateless: nothing is recorded when a token is issued, so there is
/// nothing to revoke. Tokens issued before a logout or role change remain
/// valid until `exp`.
#[derive(Clone)]
pub struct TokenService {
    codec: JwtCodec,
    issuer: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Creates a token service.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the secret is shorter than
    /// [`MIN_SECRET_LEN`] bytes, the issuer is empty, or `ttl` is zero.
    pub fn new<P>(secrets: &P, ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self, AuthError>
    where
        P: SecretProvider + ?Sized,
    {
        let secret = secrets.signing_secret();
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::configuration(format!(
                "signing secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if secrets.issuer().is_empty() {
            return Err(AuthError::configuration("issuer cannot be empty"));
        }
        if ttl.is_zero() {
            return Err(AuthError::configuration("token ttl must be greater than zero"));
        }

        Ok(Self {
            codec: JwtCodec::new(secret, secrets.issuer()),
            issuer: secrets.issuer().to_string(),
            ttl,
            clock,
        })
    }

    /// Creates a token service from the auth configuration.
    ///
    /// # Errors
    ///
    /// See [`TokenService::new`].
    pub fn from_config(config: &AuthConfig, clock: Arc<dyn Clock>) -> Result<Self, AuthError> {
        Self::new(config, config.token.ttl, clock)
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `identity`, valid from now for the configured ttl.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if signing fails or the expiry falls
    /// outside the representable date range.
    pub fn issue(&self, identity: &Identity) -> Result<String, TokenError> {
        let now = self.clock.now();
        let expires_at = time::Duration::try_from(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or_else(|| TokenError::encoding("token expiry is out of range"))?;
        let claims = SessionClaims {
            sub: identity.id.to_string(),
            uid: identity.id,
            email: identity.email.clone(),
            role: identity.role,
            iss: self.issuer.clone(),
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };
        self.codec.encode(&claims)
    }

    /// Verifies a token and returns its claims.
    ///
    /// # Errors
    ///
    /// - `BadSignature` if the signature or algorithm is wrong
    /// - `IssuerMismatch` if the issuer differs from ours
    /// - `Expired` if the clock has reached `exp`
    /// - `Malformed` for anything that does not parse, including unknown
    ///   roles and a subject that disagrees with `uid`
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let claims: SessionClaims = self.codec.decode(token)?;

        if claims.sub != claims.uid.to_string() {
            return Err(TokenError::malformed("subject does not match uid"));
        }
        let expires_at = OffsetDateTime::from_unix_timestamp(claims.exp)
            .map_err(|_| TokenError::malformed("exp out of range"))?;
        OffsetDateTime::from_unix_timestamp(claims.iat)
            .map_err(|_| TokenError::malformed("iat out of range"))?;

        if self.clock.now() >= expires_at {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::NewIdentity;
    use time::macros::datetime;

    const SECRET: &str = "test-secret-that-is-32-bytes-ok!";

    struct StaticSecrets {
        secret: &'static str,
        issuer: &'static str,
    }

    impl SecretProvider for StaticSecrets {
        fn signing_secret(&self) -> &[u8] {
            self.secret.as_bytes()
        }

        fn issuer(&self) -> &str {
            self.issuer
        }
    }

    fn identity(role: Role) -> Identity {
        NewIdentity {
            email: "dr.house@example.com".to_string(),
            password_hash: String::new(),
            role,
            created_at: datetime!(2024-01-01 00:00 UTC),
        }
        .into_identity(IdentityId::new(7))
    }

    fn service(clock: Arc<ManualClock>, issuer: &'static str) -> TokenService {
        TokenService::new(
            &StaticSecrets {
                secret: SECRET,
                issuer,
            },
            Duration::from_secs(24 * 3600),
            clock,
        )
        .unwrap()
    }

    #[test]
    fn test_out_of_range_expiry_is_an_encoding_error() {
        let clock = Arc::new(ManualClock::new(datetime!(2024-06-01 12:00 UTC)));
        let tokens = TokenService::new(
            &StaticSecrets {
                secret: SECRET,
                issuer: "sonnda-api",
            },
            Duration::from_secs(20_000 * 365 * 24 * 3600),
            clock,
        )
        .unwrap();

        let err = tokens.issue(&identity(Role::Patient)).unwrap_err();
        assert!(matches!(err, TokenError::Encoding { .. }));
    }

    #[test]
    fn test_issue_then_verify_round_trip() {
        let clock = Arc::new(ManualClock::new(datetime!(2024-06-01 12:00 UTC)));
        let tokens = service(clock, "sonnda-api");

        let token = tokens.issue(&identity(Role::Doctor)).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.identity_id(), IdentityId::new(7));
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.email, "dr.house@example.com");
        assert_eq!(claims.role, Role::Doctor);
        assert_eq!(claims.iss, "sonnda-api");
        assert_eq!(claims.issued_at(), datetime!(2024-06-01 12:00 UTC));
        assert_eq!(claims.expires_at(), datetime!(2024-06-02 12:00 UTC));
    }

    #[test]
    fn test_expiry_uses_injected_clock() {
        let clock = Arc::new(ManualClock::new(datetime!(2024-06-01 12:00 UTC)));
        let tokens = service(clock.clone(), "sonnda-api");
        let token = tokens.issue(&identity(Role::Patient)).unwrap();

        clock.set(datetime!(2024-06-02 11:59:59 UTC));
        assert!(tokens.verify(&token).is_ok());

        clock.set(datetime!(2024-06-02 12:00 UTC));
        assert_eq!(tokens.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_tampered_token_fails() {
        let clock = Arc::new(ManualClock::new(datetime!(2024-06-01 12:00 UTC)));
        let tokens = service(clock, "sonnda-api");
        let token = tokens.issue(&identity(Role::Patient)).unwrap();

        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'Q' } else { 'A' });

        assert!(tokens.verify(&tampered).is_err());
    }

    #[test]
    fn test_issuer_mismatch() {
        let clock = Arc::new(ManualClock::new(datetime!(2024-06-01 12:00 UTC)));
        let theirs = service(clock.clone(), "someone-else");
        let ours = service(clock, "sonnda-api");

        let token = theirs.issue(&identity(Role::Admin)).unwrap();
        assert_eq!(ours.verify(&token).unwrap_err(), TokenError::IssuerMismatch);
    }

    #[test]
    fn test_unknown_role_is_malformed() {
        #[derive(Serialize)]
        struct ForgedClaims<'a> {
            sub: &'a str,
            uid: i64,
            email: &'a str,
            role: &'a str,
            iss: &'a str,
            iat: i64,
            exp: i64,
        }

        let clock = Arc::new(ManualClock::new(datetime!(2024-06-01 12:00 UTC)));
        let tokens = service(clock, "sonnda-api");
        let forged = JwtCodec::new(SECRET.as_bytes(), "sonnda-api")
            .encode(&ForgedClaims {
                sub: "7",
                uid: 7,
                email: "x@example.com",
                role: "SUPERUSER",
                iss: "sonnda-api",
                iat: 1_717_243_200,
                exp: 1_717_329_600,
            })
            .unwrap();

        assert!(matches!(
            tokens.verify(&forged).unwrap_err(),
            TokenError::Malformed { .. }
        ));
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = TokenService::new(
            &StaticSecrets {
                secret: "short",
                issuer: "sonnda-api",
            },
            Duration::from_secs(60),
            Arc::new(ManualClock::new(datetime!(2024-06-01 12:00 UTC))),
        );
        assert!(matches!(result, Err(AuthError::Configuration { .. })));
    }

    #[test]
    fn test_tokens_are_not_revocable() {
        let clock = Arc::new(ManualClock::new(datetime!(2024-06-01 12:00 UTC)));
        let tokens = service(clock.clone(), "sonnda-api");
        let first = tokens.issue(&identity(Role::Doctor)).unwrap();

        // A later token for the same identity does not invalidate the first.
        clock.advance(Duration::from_secs(3600));
        let second = tokens.issue(&identity(Role::Doctor)).unwrap();

        assert!(tokens.verify(&first).is_ok());
        assert!(tokens.verify(&second).is_ok());
    }
}
