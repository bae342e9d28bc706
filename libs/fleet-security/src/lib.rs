#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod access_scope;
pub mod context;
pub mod role;

pub use access_scope::{
    AccessScope, EqScopeFilter, ScopeConstraint, ScopeFilter, ScopeValue, pep_properties,
};
pub use context::SecurityContext;
pub use role::{EffectiveRole, Role, RoleParseError, RoleSet, resolve_effective_role};
