//! Authentication and authorization error types.
//!
//! This module defines all error types that can occur during registration,
//! login, token handling, authorization checks and ledger transitions.

use std::fmt;

use crate::types::GrantStatus;

/// Errors that can occur during authentication and authorization operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A request field failed validation.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: String,
        /// Description of the validation failure.
        message: String,
    },

    /// An identity with this email is already registered.
    #[error("Email already registered")]
    EmailTaken,

    /// Email or password did not match a registered identity.
    ///
    /// Unknown emails and wrong passwords both produce this variant.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The request lacks a valid session token.
    #[error("Unauthenticated: {message}")]
    Unauthenticated {
        /// Description of why the request is unauthenticated.
        message: String,
    },

    /// The authenticated actor may not perform the action.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of why access is forbidden.
        message: String,
    },

    /// The requested grant transition is not allowed from the current status.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current (effective) status of the grant.
        from: GrantStatus,
        /// Requested status.
        to: GrantStatus,
    },

    /// A referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of entity (e.g. "identity", "grant").
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// A uniqueness constraint was violated in the store.
    #[error("Duplicate key: {key}")]
    DuplicateKey {
        /// The conflicting key.
        key: String,
    },

    /// An optimistic concurrency check failed in the store.
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflict.
        message: String,
    },

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// A store call did not complete within the configured bound.
    #[error("Operation timed out: {operation}")]
    Timeout {
        /// Name of the store operation.
        operation: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Unauthenticated` error.
    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidTransition` error.
    #[must_use]
    pub fn invalid_transition(from: GrantStatus, to: GrantStatus) -> Self {
        Self::InvalidTransition { from, to }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Creates a new `DuplicateKey` error.
    #[must_use]
    pub fn duplicate_key(key: impl Into<String>) -> Self {
        Self::DuplicateKey { key: key.into() }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::EmailTaken
                | Self::InvalidCredentials
                | Self::Unauthenticated { .. }
                | Self::Forbidden { .. }
                | Self::InvalidTransition { .. }
                | Self::NotFound { .. }
                | Self::DuplicateKey { .. }
                | Self::Conflict { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. }
                | Self::Timeout { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns `true` if retrying the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Timeout { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::EmailTaken => ErrorCategory::Validation,
            Self::InvalidCredentials => ErrorCategory::Authentication,
            Self::Unauthenticated { .. } => ErrorCategory::Authentication,
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::InvalidTransition { .. } => ErrorCategory::Workflow,
            Self::NotFound { .. } => ErrorCategory::Validation,
            Self::DuplicateKey { .. } => ErrorCategory::Infrastructure,
            Self::Conflict { .. } => ErrorCategory::Infrastructure,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Timeout { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the machine-readable error code sent to clients.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "invalid_request",
            Self::EmailTaken => "email_taken",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Unauthenticated { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::NotFound { .. } => "not_found",
            Self::DuplicateKey { .. } => "conflict",
            Self::Conflict { .. } => "conflict",
            Self::Storage { .. } => "server_error",
            Self::Timeout { .. } => "temporarily_unavailable",
            Self::Configuration { .. } => "server_error",
            Self::Internal { .. } => "server_error",
        }
    }
}

/// Categories of authentication/authorization errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Authentication-related errors (identity verification).
    Authentication,
    /// Authorization-related errors (permission checks).
    Authorization,
    /// Grant workflow errors (illegal transitions).
    Workflow,
    /// Request validation errors.
    Validation,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Workflow => write!(f, "workflow"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_field() {
        let err = AuthError::validation("email", "must be a valid email address");
        assert_eq!(
            err.to_string(),
            "Invalid email: must be a valid email address"
        );
        assert!(err.is_client_error());
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = AuthError::invalid_transition(GrantStatus::Revoked, GrantStatus::Approved);
        assert_eq!(err.to_string(), "Invalid transition from REVOKED to APPROVED");
        assert_eq!(err.category(), ErrorCategory::Workflow);
        assert_eq!(err.error_code(), "invalid_transition");
    }

    #[test]
    fn test_server_errors_share_generic_code() {
        for err in [
            AuthError::storage("connection reset"),
            AuthError::configuration("missing secret"),
            AuthError::internal("join error"),
        ] {
            assert!(err.is_server_error());
            assert!(!err.is_client_error());
            assert_eq!(err.error_code(), "server_error");
        }
    }

    #[test]
    fn test_retryable_errors() {
        assert!(AuthError::conflict("status changed").is_retryable());
        assert!(AuthError::timeout("grant.begin").is_retryable());
        assert!(!AuthError::InvalidCredentials.is_retryable());
        assert!(!AuthError::forbidden("no grant").is_retryable());
    }

    #[test]
    fn test_not_found_display() {
        let err = AuthError::not_found("grant", 7);
        assert_eq!(err.to_string(), "grant 7 not found");
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Authentication.to_string(), "authentication");
        assert_eq!(ErrorCategory::Workflow.to_string(), "workflow");
        assert_eq!(ErrorCategory::Infrastructure.to_string(), "infrastructure");
    }
}
