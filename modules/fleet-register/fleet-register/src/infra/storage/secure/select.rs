use std::marker::PhantomData;

use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use super::cond::{build_machine_scope_condition, build_scope_condition};
use super::{AccessScope, MachineOwnedEntity, ScopableEntity, ScopeError};
use crate::infra::storage::db::DBRunner;
use fleet_security::pep_properties;

/// Typestate marker: query has not yet been scoped.
/// Cannot execute queries in this state.
#[derive(Debug, Clone, Copy)]
pub struct Unscoped;

/// Typestate marker: query has been scoped with access control.
#[derive(Debug, Clone, Copy)]
pub struct Scoped;

/// A type-safe wrapper around `SeaORM`'s `Select` that enforces scoping.
///
/// Queries cannot be executed before access control is applied with
/// `.scope_with()` (own columns) or `.scope_via_machine()` (parent machine).
///
/// # Example
/// ```rust,ignore
/// let scope = AccessScope::for_client(party_id);
/// let machines = machine::Entity::find()
///     .secure()           // SecureSelect<E, Unscoped>
///     .scope_with(&scope) // SecureSelect<E, Scoped>
///     .all(conn)
///     .await?;
/// ```
#[must_use]
#[derive(Clone, Debug)]
pub struct SecureSelect<E: EntityTrait, S> {
    inner: sea_orm::Select<E>,
    state: PhantomData<S>,
}

/// Extension trait to convert a regular `SeaORM` `Select` into a `SecureSelect`.
pub trait SecureEntityExt<E: EntityTrait>: Sized {
    /// Convert this select query into a secure (unscoped) select.
    /// You must scope it before executing the query.
    fn secure(self) -> SecureSelect<E, Unscoped>;
}

impl<E> SecureEntityExt<E> for sea_orm::Select<E>
where
    E: EntityTrait,
{
    fn secure(self) -> SecureSelect<E, Unscoped> {
        SecureSelect {
            inner: self,
            state: PhantomData,
        }
    }
}

impl<E> SecureSelect<E, Unscoped>
where
    E: ScopableEntity,
{
    /// Apply access control using the entity's own columns.
    pub fn scope_with(self, scope: &AccessScope) -> SecureSelect<E, Scoped> {
        let cond = build_scope_condition::<E>(scope);
        SecureSelect {
            inner: self.inner.filter(cond),
            state: PhantomData,
        }
    }
}

impl<E> SecureSelect<E, Unscoped>
where
    E: MachineOwnedEntity,
{
    /// Apply access control through the parent machine's ownership columns.
    pub fn scope_via_machine(self, scope: &AccessScope) -> SecureSelect<E, Scoped> {
        let cond = build_machine_scope_condition::<E>(scope);
        SecureSelect {
            inner: self.inner.filter(cond),
            state: PhantomData,
        }
    }
}

impl<E> SecureSelect<E, Scoped>
where
    E: EntityTrait,
{
    /// Execute the query and return all matching results.
    ///
    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn all(self, runner: &impl DBRunner) -> Result<Vec<E::Model>, ScopeError> {
        Ok(self.inner.all(runner).await?)
    }

    /// Execute the query and return at most one result.
    ///
    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn one(self, runner: &impl DBRunner) -> Result<Option<E::Model>, ScopeError> {
        Ok(self.inner.one(runner).await?)
    }

    /// Execute the query and return the number of matching results.
    ///
    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn count(self, runner: &impl DBRunner) -> Result<u64, ScopeError>
    where
        E::Model: Send + Sync,
    {
        Ok(self.inner.count(runner).await?)
    }

    /// Narrow a scoped query to a single resource.
    ///
    /// # Errors
    /// Returns `ScopeError::Invalid` if the entity has no resource column.
    pub fn and_id(self, id: uuid::Uuid) -> Result<Self, ScopeError>
    where
        E: ScopableEntity,
    {
        let resource_col = E::resolve_property(pep_properties::RESOURCE_ID).ok_or(
            ScopeError::Invalid("entity must resolve a resource column to use and_id()"),
        )?;
        Ok(self.filter(Condition::all().add(resource_col.eq(id))))
    }

    /// Add additional filters to the scoped query.
    /// The scope conditions remain in place.
    pub fn filter(mut self, filter: Condition) -> Self {
        self.inner = QueryFilter::filter(self.inner, filter);
        self
    }

    /// Add ordering to the scoped query.
    pub fn order_by<C>(mut self, col: C, order: sea_orm::Order) -> Self
    where
        C: sea_orm::IntoSimpleExpr,
    {
        self.inner = QueryOrder::order_by(self.inner, col, order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.inner = QuerySelect::limit(self.inner, limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.inner = QuerySelect::offset(self.inner, offset);
        self
    }
}
