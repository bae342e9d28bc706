use fleet_security::{AccessScope, EffectiveRole};

use super::Requester;
use crate::domain::error::DomainError;

/// Compile a requester into the rows it may read.
///
/// Machines are matched on their own ownership columns; child records are
/// matched through their parent machine.
#[must_use]
pub fn scope_for(requester: &Requester) -> AccessScope {
    let Some(party) = requester.party_id() else {
        return AccessScope::deny_all();
    };
    match requester.role() {
        EffectiveRole::Manager => AccessScope::allow_all(),
        EffectiveRole::Service => AccessScope::for_service_company(party),
        EffectiveRole::Client => AccessScope::for_client(party),
        EffectiveRole::Implicit => AccessScope::for_client_or_service_company(party),
        EffectiveRole::Anonymous => AccessScope::deny_all(),
    }
}

/// Reference entries and the party directory are visible to every
/// authenticated requester.
///
/// # Errors
/// Returns `DomainError::Unauthenticated` for anonymous requesters.
pub fn require_authenticated(requester: &Requester) -> Result<(), DomainError> {
    if requester.role().is_authenticated() {
        Ok(())
    } else {
        Err(DomainError::Unauthenticated)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use fleet_security::{Role, RoleSet};
    use uuid::Uuid;

    fn requester(role: EffectiveRole, party: Uuid) -> Requester {
        Requester::new(Some(party), role, RoleSet::from([Role::Client, Role::Service]))
    }

    #[test]
    fn each_role_compiles_to_its_slice() {
        let me = Uuid::now_v7();
        assert!(scope_for(&requester(EffectiveRole::Manager, me)).is_unconstrained());
        assert_eq!(
            scope_for(&requester(EffectiveRole::Client, me)),
            AccessScope::for_client(me)
        );
        assert_eq!(
            scope_for(&requester(EffectiveRole::Service, me)),
            AccessScope::for_service_company(me)
        );
        assert_eq!(
            scope_for(&requester(EffectiveRole::Implicit, me)),
            AccessScope::for_client_or_service_company(me)
        );
    }

    #[test]
    fn anonymous_sees_nothing_even_with_a_party() {
        let me = Uuid::now_v7();
        assert!(scope_for(&requester(EffectiveRole::Anonymous, me)).is_deny_all());
        let anon = Requester::new(None, EffectiveRole::Anonymous, RoleSet::new());
        assert!(scope_for(&anon).is_deny_all());
    }

    #[test]
    fn shared_vocabulary_requires_authentication() {
        let me = Uuid::now_v7();
        assert!(require_authenticated(&requester(EffectiveRole::Implicit, me)).is_ok());
        let anon = Requester::new(None, EffectiveRole::Anonymous, RoleSet::new());
        assert!(matches!(
            require_authenticated(&anon),
            Err(DomainError::Unauthenticated)
        ));
    }
}
