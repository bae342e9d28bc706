use sea_orm::sea_query::{Expr, Query};
use sea_orm::{ColumnTrait, Condition, EntityTrait};

use super::{AccessScope, MachineOwnedEntity, ScopableEntity};
use crate::infra::storage::entity::machine;
use fleet_security::access_scope::{ScopeConstraint, ScopeFilter, ScopeValue};

fn scope_value_to_sea_value(v: &ScopeValue) -> sea_orm::Value {
    match v {
        ScopeValue::Uuid(u) => sea_orm::Value::from(*u),
    }
}

/// Build a deny-all condition (`WHERE false`).
fn deny_all() -> Condition {
    Condition::all().add(Expr::value(false))
}

/// Builds a `SeaORM` `Condition` from an `AccessScope` using property resolution.
///
/// - Multiple constraints are OR-ed (alternative access paths)
/// - Filters within a constraint are AND-ed (all must match)
/// - Unknown properties fail that constraint (fail-closed)
/// - If all constraints fail resolution, deny-all
///
/// | Scope | Behavior |
/// |-------|----------|
/// | deny-all (default) | `WHERE false` |
/// | unconstrained (allow-all) | No filtering |
/// | single constraint | AND of resolved filters |
/// | multiple constraints | OR of ANDed filter groups |
pub fn build_scope_condition<E>(scope: &AccessScope) -> Condition
where
    E: ScopableEntity,
{
    if scope.is_unconstrained() {
        return Condition::all();
    }
    if scope.is_deny_all() {
        return deny_all();
    }

    let compiled: Vec<Condition> = scope
        .constraints()
        .iter()
        .filter_map(build_constraint_condition::<E>)
        .collect();

    if compiled.is_empty() {
        return deny_all();
    }
    compiled
        .into_iter()
        .fold(Condition::any(), Condition::add)
}

/// Scope rows of a machine-owned entity through their parent machine:
/// `machine_id IN (SELECT id FROM machines WHERE <scope>)`.
pub fn build_machine_scope_condition<E>(scope: &AccessScope) -> Condition
where
    E: MachineOwnedEntity,
{
    if scope.is_unconstrained() {
        return Condition::all();
    }
    if scope.is_deny_all() {
        return deny_all();
    }

    let visible_machines = Query::select()
        .column(machine::Column::Id)
        .from(machine::Entity)
        .cond_where(build_scope_condition::<machine::Entity>(scope))
        .to_owned();

    Condition::all().add(E::machine_col().in_subquery(visible_machines))
}

/// Build SQL for a single constraint (AND of filters).
///
/// Returns `None` if the constraint is empty or any filter references an
/// unknown property.
fn build_constraint_condition<E>(constraint: &ScopeConstraint) -> Option<Condition>
where
    E: ScopableEntity,
{
    if constraint.is_empty() {
        return None;
    }
    let mut and_cond = Condition::all();
    for filter in constraint.filters() {
        let col = E::resolve_property(filter.property())?;
        match filter {
            ScopeFilter::Eq(eq) => {
                and_cond = and_cond.add(col.eq(scope_value_to_sea_value(eq.value())));
            }
        }
    }
    Some(and_cond)
}
