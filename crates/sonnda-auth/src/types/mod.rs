//! Common types used across the authentication and authorization modules.
//!
//! This module contains shared type definitions that are used by multiple
//! submodules within the auth crate.
//!
//! ## Domain Types
//!
//! - [`Identity`] - A registered account with its role
//! - [`Role`] - The closed set of actor roles
//! - [`Grant`] - A doctor's access authorization to a patient record
//! - [`HistoryEntry`] - One recorded grant status transition

pub mod grant;
pub mod id;
pub mod identity;
pub mod role;

pub use grant::{Grant, GrantStatus, HistoryEntry, NewGrant, NewHistoryEntry};
pub use id::{GrantId, HistoryEntryId, IdentityId, PatientId};
pub use identity::{Identity, NewIdentity};
pub use role::{Role, RoleParseError};
