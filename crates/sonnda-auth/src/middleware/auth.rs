//! Bearer token authentication extractors.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use sonnda_auth::middleware::{Actor, GateState};
//!
//! async fn me(Actor(actor): Actor) -> String {
//!     format!("Hello, {}!", actor.email)
//! }
//!
//! let app = Router::new()
//!     .route("/auth/me", get(me))
//!     .with_state(gate_state);
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AuthError;
use crate::gate::{AccessGate, ActorContext, roles};

/// State required by the authentication extractors.
///
/// Include it in your application state and expose it through `FromRef`.
#[derive(Clone)]
pub struct GateState {
    pub gate: Arc<AccessGate>,
}

impl GateState {
    #[must_use]
    pub fn new(gate: Arc<AccessGate>) -> Self {
        Self { gate }
    }
}

/// Axum extractor that validates the bearer token.
///
/// # Errors
///
/// Rejects with `AuthError::Unauthenticated` (401) if the `Authorization`
/// header is missing, malformed, or carries an invalid token.
#[derive(Debug, Clone)]
pub struct Actor(pub ActorContext);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
    GateState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = GateState::from_ref(state);
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        state.gate.authenticate_header(header).map(Actor)
    }
}

/// Axum extractor that requires an authenticated ADMIN.
///
/// # Errors
///
/// Rejects with 401 if authentication fails and 403 if the actor is not
/// an administrator.
#[derive(Debug, Clone)]
pub struct AdminActor(pub ActorContext);

impl<S> FromRequestParts<S> for AdminActor
where
    S: Send + Sync,
    GateState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Actor(actor) = Actor::from_request_parts(parts, state).await?;
        let state = GateState::from_ref(state);

        state.gate.authorize(&actor, roles::ADMIN, None).await?;
        tracing::debug!(identity_id = %actor.identity_id, "Admin access granted");
        Ok(AdminActor(actor))
    }
}
