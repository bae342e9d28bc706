//! Role-scoped access control.
//!
//! Two pure decisions, shared by the REST layer and the import job:
//! - [`visibility`] decides which rows a requester may read;
//! - [`mutation`] decides whether a requester may write a record.
//!
//! Both consult the same [`Ownership`] of a machine. Child records
//! (maintenance, complaints) inherit the ownership of their parent machine.

use fleet_security::{EffectiveRole, Role, RoleSet, SecurityContext};
use uuid::Uuid;

pub mod mutation;
pub mod visibility;

pub use mutation::authorize_write;
pub use visibility::{require_authenticated, scope_for};

/// The authorization-relevant view of a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    party_id: Option<Uuid>,
    role: EffectiveRole,
    memberships: RoleSet,
}

impl Requester {
    #[must_use]
    pub fn new(party_id: Option<Uuid>, role: EffectiveRole, memberships: RoleSet) -> Self {
        Self {
            party_id,
            role,
            memberships,
        }
    }

    /// Resolve the effective role of `ctx` and capture what authorization needs.
    #[must_use]
    pub fn from_context(ctx: &SecurityContext) -> Self {
        Self::new(ctx.subject_id(), ctx.effective_role(), ctx.memberships().clone())
    }

    #[must_use]
    pub fn party_id(&self) -> Option<Uuid> {
        self.party_id
    }

    #[must_use]
    pub fn role(&self) -> EffectiveRole {
        self.role
    }

    #[must_use]
    pub fn holds(&self, role: Role) -> bool {
        self.memberships.contains(role)
    }
}

/// Who owns and who services a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub client_id: Uuid,
    pub service_company_id: Uuid,
}

impl Ownership {
    #[must_use]
    pub fn new(client_id: Uuid, service_company_id: Uuid) -> Self {
        Self {
            client_id,
            service_company_id,
        }
    }

    /// The party is the machine's client or its service company.
    #[must_use]
    pub fn involves(&self, party: Uuid) -> bool {
        self.client_id == party || self.service_company_id == party
    }
}

impl From<&fleet_register_sdk::Machine> for Ownership {
    fn from(m: &fleet_register_sdk::Machine) -> Self {
        Self::new(m.client_id, m.service_company_id)
    }
}

/// Kinds of records guarded by the mutation authorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Machine,
    Maintenance,
    Complaint,
    Reference,
    Party,
}

impl Resource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Machine => "machine",
            Self::Maintenance => "maintenance",
            Self::Complaint => "complaint",
            Self::Reference => "reference",
            Self::Party => "party",
        }
    }
}
