use fleet_security::{EffectiveRole, Role};

use super::{Ownership, Requester, Resource};
use crate::domain::error::DomainError;

/// Decide whether `requester` may create, update or delete a `resource`.
///
/// `target` is the ownership of the machine the record belongs to. For an
/// update that moves a record to another machine, call this once per machine.
/// Child records are never authorized against a missing machine.
///
/// # Errors
/// - `DomainError::Unauthenticated` for anonymous requesters;
/// - `DomainError::Forbidden` when the role may not perform the write.
pub fn authorize_write(
    requester: &Requester,
    resource: Resource,
    target: Option<&Ownership>,
) -> Result<(), DomainError> {
    let owns = || match (requester.party_id(), target) {
        (Some(party), Some(t)) => t.involves(party),
        _ => false,
    };

    let allowed = match (requester.role(), resource) {
        (EffectiveRole::Anonymous, _) => return Err(DomainError::Unauthenticated),
        (EffectiveRole::Manager, _) => true,

        (EffectiveRole::Service, Resource::Maintenance | Resource::Complaint)
        | (EffectiveRole::Client, Resource::Maintenance) => owns(),
        (EffectiveRole::Implicit, Resource::Maintenance) => {
            (requester.holds(Role::Service) || requester.holds(Role::Client)) && owns()
        }
        (EffectiveRole::Implicit, Resource::Complaint) => requester.holds(Role::Service) && owns(),

        (
            EffectiveRole::Service | EffectiveRole::Client | EffectiveRole::Implicit,
            Resource::Machine | Resource::Reference | Resource::Party,
        )
        | (EffectiveRole::Client, Resource::Complaint) => false,
    };

    if allowed {
        Ok(())
    } else {
        tracing::debug!(
            role = %requester.role(),
            resource = resource.as_str(),
            "write denied"
        );
        Err(DomainError::Forbidden)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use fleet_security::RoleSet;
    use uuid::Uuid;

    const ALL_RESOURCES: [Resource; 5] = [
        Resource::Machine,
        Resource::Maintenance,
        Resource::Complaint,
        Resource::Reference,
        Resource::Party,
    ];

    fn requester(role: EffectiveRole, party: Uuid, roles: &[Role]) -> Requester {
        Requester::new(Some(party), role, roles.iter().copied().collect())
    }

    fn allowed(r: &Requester, resource: Resource, target: &Ownership) -> bool {
        authorize_write(r, resource, Some(target)).is_ok()
    }

    #[test]
    fn manager_may_write_everything() {
        let me = Uuid::now_v7();
        let unrelated = Ownership::new(Uuid::now_v7(), Uuid::now_v7());
        let r = requester(EffectiveRole::Manager, me, &[Role::Manager]);
        for resource in ALL_RESOURCES {
            assert!(allowed(&r, resource, &unrelated), "{}", resource.as_str());
        }
    }

    #[test]
    fn service_writes_records_of_serviced_machines_only() {
        let me = Uuid::now_v7();
        let serviced = Ownership::new(Uuid::now_v7(), me);
        let unrelated = Ownership::new(Uuid::now_v7(), Uuid::now_v7());
        let r = requester(EffectiveRole::Service, me, &[Role::Service]);

        assert!(allowed(&r, Resource::Maintenance, &serviced));
        assert!(allowed(&r, Resource::Complaint, &serviced));
        assert!(!allowed(&r, Resource::Maintenance, &unrelated));
        assert!(!allowed(&r, Resource::Complaint, &unrelated));
        assert!(!allowed(&r, Resource::Machine, &serviced));
        assert!(!allowed(&r, Resource::Reference, &serviced));
        assert!(!allowed(&r, Resource::Party, &serviced));
    }

    #[test]
    fn client_writes_maintenance_of_own_machines_only() {
        let me = Uuid::now_v7();
        let owned = Ownership::new(me, Uuid::now_v7());
        let unrelated = Ownership::new(Uuid::now_v7(), Uuid::now_v7());
        let r = requester(EffectiveRole::Client, me, &[Role::Client]);

        assert!(allowed(&r, Resource::Maintenance, &owned));
        assert!(!allowed(&r, Resource::Maintenance, &unrelated));
        assert!(!allowed(&r, Resource::Complaint, &owned));
        assert!(!allowed(&r, Resource::Machine, &owned));
    }

    #[test]
    fn implicit_follows_memberships() {
        let me = Uuid::now_v7();
        let owned = Ownership::new(me, Uuid::now_v7());

        let client_only = requester(EffectiveRole::Implicit, me, &[Role::Client]);
        assert!(allowed(&client_only, Resource::Maintenance, &owned));
        assert!(!allowed(&client_only, Resource::Complaint, &owned));

        let service_member = requester(EffectiveRole::Implicit, me, &[Role::Service]);
        assert!(allowed(&service_member, Resource::Complaint, &owned));

        let no_roles = requester(EffectiveRole::Implicit, me, &[]);
        assert!(!allowed(&no_roles, Resource::Maintenance, &owned));
        assert!(!allowed(&no_roles, Resource::Complaint, &owned));
        assert!(!allowed(&no_roles, Resource::Machine, &owned));
    }

    #[test]
    fn anonymous_needs_authentication() {
        let anon = Requester::new(None, EffectiveRole::Anonymous, RoleSet::new());
        for resource in ALL_RESOURCES {
            assert!(matches!(
                authorize_write(&anon, resource, None),
                Err(DomainError::Unauthenticated)
            ));
        }
    }

    #[test]
    fn child_records_never_authorize_against_missing_machine() {
        let me = Uuid::now_v7();
        let r = requester(EffectiveRole::Service, me, &[Role::Service]);
        assert!(matches!(
            authorize_write(&r, Resource::Maintenance, None),
            Err(DomainError::Forbidden)
        ));
    }
}
