use fleet_register_sdk::FleetRegisterError;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::infra::storage::secure::ScopeError;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} '{identifier}' already exists")]
    AlreadyExists {
        entity: &'static str,
        identifier: String,
    },

    #[error("{entity} {id} is still in use")]
    InUse { entity: &'static str, id: String },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Access denied")]
    Forbidden,

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity: &'static str, identifier: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            identifier: identifier.into(),
        }
    }

    pub fn in_use(entity: &'static str, id: impl ToString) -> Self {
        Self::InUse {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}

impl From<DbErr> for DomainError {
    fn from(e: DbErr) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => {
                tracing::debug!(error = %msg, "Unique constraint violated");
                DomainError::already_exists("record", msg)
            }
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => {
                tracing::debug!(error = %msg, "Foreign key constraint violated");
                DomainError::InUse {
                    entity: "record",
                    id: msg,
                }
            }
            _ => DomainError::database(e.to_string()),
        }
    }
}

impl From<ScopeError> for DomainError {
    fn from(e: ScopeError) -> Self {
        match e {
            ScopeError::Db(db) => db.into(),
            ScopeError::Invalid(msg) => DomainError::database(format!("scope invalid: {msg}")),
        }
    }
}

/// Convert domain errors to SDK errors for public API consumption.
impl From<DomainError> for FleetRegisterError {
    fn from(domain_error: DomainError) -> Self {
        match domain_error {
            DomainError::NotFound { entity, id } => FleetRegisterError::not_found(entity, id),
            DomainError::AlreadyExists { entity, identifier } => {
                FleetRegisterError::conflict(identifier, format!("{entity} already exists"))
            }
            DomainError::InUse { entity, id } => {
                FleetRegisterError::conflict(id, format!("{entity} is still in use"))
            }
            DomainError::Validation { field, message } => {
                FleetRegisterError::validation(format!("{field}: {message}"))
            }
            DomainError::Unauthenticated => FleetRegisterError::unauthenticated(),
            DomainError::Forbidden => FleetRegisterError::forbidden(),
            DomainError::Database { .. } => FleetRegisterError::internal(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn database_details_do_not_leak_into_sdk_error() {
        let sdk: FleetRegisterError = DomainError::database("connection reset by peer").into();
        assert_eq!(sdk, FleetRegisterError::Internal);
        assert!(!sdk.to_string().contains("connection reset"));
    }

    #[test]
    fn validation_names_the_field() {
        let sdk: FleetRegisterError =
            DomainError::validation("recovery_date", "must not precede failure_date").into();
        assert_eq!(
            sdk,
            FleetRegisterError::validation("recovery_date: must not precede failure_date")
        );
    }
}
