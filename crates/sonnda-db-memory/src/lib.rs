//! In-memory storage backend for the Sonnda identity and authorization core.
//!
//! This crate implements the storage traits from `sonnda-auth`:
//!
//! - [`sonnda_auth::CredentialStore`] with a unique email index
//! - [`sonnda_auth::GrantStore`] with serialized status transactions
//! - [`sonnda_auth::PatientDirectory`] for record ownership
//!
//! Identities and patients live in papaya lock-free maps. Grants and their
//! history share one async mutex so a transaction sees and writes both
//! consistently.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sonnda_db_memory::InMemoryAuthStorage;
//!
//! let storage = Arc::new(InMemoryAuthStorage::new());
//! storage.register_patient(PatientId::new(42), owner_id);
//! let ledger = AuthorizationLedger::new(storage.clone(), &config, clock);
//! ```

pub mod storage;
pub mod transaction;

pub use storage::InMemoryAuthStorage;
pub use transaction::InMemoryGrantTransaction;
