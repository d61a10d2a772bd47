//! Session token issuing and verification.
//!
//! Tokens are HS256-signed JWTs carrying the identity id, email and role.
//! They are stateless: there is no session store and no revocation list,
//! so a token stays valid until it expires even if the identity logs out
//! or its role changes.
//!
//! - [`jwt`] - HS256 encoding/decoding and error mapping
//! - [`service`] - [`TokenService`] minting and verifying session claims

pub mod jwt;
pub mod service;

pub use jwt::{JwtCodec, TokenError};
pub use service::{SecretProvider, SessionClaims, TokenService};
