//! Public error types for the `fleet_register` module.
//!
//! These errors are safe to expose to other modules and consumers.

use thiserror::Error;

/// Errors that can be returned by the fleet register.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FleetRegisterError {
    /// Resource with the specified identifier was not found, or is not visible.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A resource with the specified identifier already exists or is still in use.
    #[error("Conflict on '{identifier}': {message}")]
    Conflict { identifier: String, message: String },

    /// Validation error with the provided data.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The caller is not authenticated.
    #[error("Authentication required")]
    Unauthenticated,

    /// Access denied (authorization failure).
    #[error("Access denied")]
    Forbidden,

    /// An internal error occurred.
    #[error("Internal error")]
    Internal,
}

impl FleetRegisterError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::Unauthenticated
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::Forbidden
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::Internal
    }
}
