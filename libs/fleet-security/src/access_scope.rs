use uuid::Uuid;

/// A scalar value for scope filtering.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeValue {
    /// UUID value (party IDs, resource IDs).
    Uuid(Uuid),
}

impl From<Uuid> for ScopeValue {
    #[inline]
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

/// Well-known authorization property names.
///
/// Shared between the visibility filter that builds scopes and the ORM
/// condition builder (`ScopableEntity::resolve_property()`).
pub mod pep_properties {
    /// Resource identity property. Maps to the primary key column.
    pub const RESOURCE_ID: &str = "id";

    /// Owning client of the (parent) machine.
    pub const CLIENT_ID: &str = "client_id";

    /// Assigned service company of the (parent) machine.
    pub const SERVICE_COMPANY_ID: &str = "service_company_id";
}

/// A single scope filter: a typed predicate on a named resource property.
///
/// Mapping to DB columns is done by `ScopableEntity::resolve_property()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeFilter {
    /// Equality: `property = value`.
    Eq(EqScopeFilter),
}

/// Equality scope filter: `property = value`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EqScopeFilter {
    property: String,
    value: ScopeValue,
}

impl EqScopeFilter {
    #[must_use]
    pub fn new(property: impl Into<String>, value: impl Into<ScopeValue>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> &ScopeValue {
        &self.value
    }
}

impl ScopeFilter {
    /// Create an equality filter (`property = value`).
    #[must_use]
    pub fn eq(property: impl Into<String>, value: impl Into<ScopeValue>) -> Self {
        Self::Eq(EqScopeFilter::new(property, value))
    }

    #[must_use]
    pub fn property(&self) -> &str {
        match self {
            Self::Eq(f) => f.property(),
        }
    }
}

/// A conjunction (AND) of scope filters: one access path.
#[derive(Clone, Debug, PartialEq)]
pub struct ScopeConstraint {
    filters: Vec<ScopeFilter>,
}

impl ScopeConstraint {
    #[must_use]
    pub fn new(filters: Vec<ScopeFilter>) -> Self {
        Self { filters }
    }

    #[inline]
    #[must_use]
    pub fn filters(&self) -> &[ScopeFilter] {
        &self.filters
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// A disjunction (OR) of scope constraints defining what data is accessible.
///
/// Each constraint is an independent access path (OR-ed). Filters within a
/// constraint are AND-ed. An unconstrained scope bypasses row-level filtering.
///
/// # Examples
///
/// ```
/// use fleet_security::access_scope::{AccessScope, pep_properties};
/// use uuid::Uuid;
///
/// // deny-all (default)
/// let scope = AccessScope::deny_all();
/// assert!(scope.is_deny_all());
///
/// // rows owned by one client
/// let scope = AccessScope::for_client(Uuid::new_v4());
/// let filters = scope.constraints()[0].filters();
/// assert_eq!(filters[0].property(), pep_properties::CLIENT_ID);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct AccessScope {
    constraints: Vec<ScopeConstraint>,
    unconstrained: bool,
}

impl Default for AccessScope {
    /// Default is deny-all: no constraints and not unconstrained.
    fn default() -> Self {
        Self::deny_all()
    }
}

impl AccessScope {
    // ── Constructors ────────────────────────────────────────────────

    /// Create an access scope from a list of constraints (OR-ed).
    #[must_use]
    pub fn from_constraints(constraints: Vec<ScopeConstraint>) -> Self {
        Self {
            constraints,
            unconstrained: false,
        }
    }

    /// Create an access scope with a single constraint.
    #[must_use]
    pub fn single(constraint: ScopeConstraint) -> Self {
        Self::from_constraints(vec![constraint])
    }

    /// Create an "allow all" (unconstrained) scope.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            constraints: Vec::new(),
            unconstrained: true,
        }
    }

    /// Create a "deny all" scope (no access).
    #[must_use]
    pub fn deny_all() -> Self {
        Self {
            constraints: Vec::new(),
            unconstrained: false,
        }
    }

    // ── Convenience constructors ────────────────────────────────────

    /// Rows whose (parent) machine is owned by `party`.
    #[must_use]
    pub fn for_client(party: Uuid) -> Self {
        Self::single(ScopeConstraint::new(vec![ScopeFilter::eq(
            pep_properties::CLIENT_ID,
            party,
        )]))
    }

    /// Rows whose (parent) machine is serviced by `party`.
    #[must_use]
    pub fn for_service_company(party: Uuid) -> Self {
        Self::single(ScopeConstraint::new(vec![ScopeFilter::eq(
            pep_properties::SERVICE_COMPANY_ID,
            party,
        )]))
    }

    /// Rows where `party` is the client OR the service company.
    #[must_use]
    pub fn for_client_or_service_company(party: Uuid) -> Self {
        Self::from_constraints(vec![
            ScopeConstraint::new(vec![ScopeFilter::eq(pep_properties::CLIENT_ID, party)]),
            ScopeConstraint::new(vec![ScopeFilter::eq(
                pep_properties::SERVICE_COMPANY_ID,
                party,
            )]),
        ])
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn constraints(&self) -> &[ScopeConstraint] {
        &self.constraints
    }

    #[inline]
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.unconstrained
    }

    /// A scope is deny-all when it is not unconstrained and has no constraints.
    #[must_use]
    pub fn is_deny_all(&self) -> bool {
        !self.unconstrained && self.constraints.is_empty()
    }
}
