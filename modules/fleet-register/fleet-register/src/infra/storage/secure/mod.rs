//! Row-level scoping for `SeaORM` selects.
//!
//! An [`AccessScope`] is compiled into a `WHERE` condition before a query can
//! run. Machines are scoped by their own ownership columns; maintenance and
//! complaint rows are scoped through their parent machine with an
//! `IN (SELECT ...)` subquery, so a visible row is returned once however many
//! access paths match it.

mod cond;
mod entity_traits;
mod select;

pub use cond::{build_machine_scope_condition, build_scope_condition};
pub use entity_traits::{MachineOwnedEntity, ScopableEntity};
pub use select::{Scoped, SecureEntityExt, SecureSelect, Unscoped};

pub use fleet_security::AccessScope;

/// Errors raised while building or running a scoped query.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("invalid scope usage: {0}")]
    Invalid(&'static str),

    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}
