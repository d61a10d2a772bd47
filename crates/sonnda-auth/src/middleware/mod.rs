//! HTTP middleware for authentication and authorization.
//!
//! This module provides Axum extractors that run the [`crate::gate`]
//! checks before a handler body executes.
//!
//! # Extractors
//!
//! - [`Actor`] - Requires a valid bearer token, yields the [`ActorContext`]
//! - [`AdminActor`] - Same as [`Actor`], but also requires the ADMIN role
//!
//! Handlers that target a patient record call
//! [`crate::gate::AccessGate::authorize`] with the record id once it is
//! known from the path.
//!
//! # Error Handling
//!
//! [`crate::error::AuthError`] implements `IntoResponse`, so extractor
//! rejections and handler errors render the same JSON body:
//!
//! ```json
//! { "error": "forbidden", "message": "no approved grant" }
//! ```
//!
//! [`ActorContext`]: crate::gate::ActorContext

mod auth;
mod error;

pub use auth::{Actor, AdminActor, GateState};
