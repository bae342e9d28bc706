use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::SecurityContext;

/// A role membership a party may hold.
///
/// Roles are plain membership flags attached to an identity. A party may hold
/// several of them at once; which one is active for a request is decided by
/// [`resolve_effective_role`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manufacturer staff: full access to every record and to reference data.
    Manager,
    /// Service company: sees and maintains the machines it services.
    Service,
    /// Machine owner: sees its machines, may log maintenance on them.
    Client,
}

impl Role {
    /// All known roles, in bootstrap order.
    pub const ALL: [Role; 3] = [Role::Manager, Role::Service, Role::Client];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::Service => "service",
            Self::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manager" => Ok(Self::Manager),
            "service" => Ok(Self::Service),
            "client" => Ok(Self::Client),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

/// The set of role memberships held by a party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Role; N]> for RoleSet {
    fn from(roles: [Role; N]) -> Self {
        roles.into_iter().collect()
    }
}

/// The role a request acts under after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectiveRole {
    Manager,
    Service,
    Client,
    /// No usable role hint: the caller sees the union of its client and
    /// service-company slices. Kept for compatibility with callers that never
    /// send a hint.
    Implicit,
    Anonymous,
}

impl EffectiveRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::Service => "service",
            Self::Client => "client",
            Self::Implicit => "implicit",
            Self::Anonymous => "anonymous",
        }
    }

    #[must_use]
    pub fn is_authenticated(self) -> bool {
        !matches!(self, Self::Anonymous)
    }
}

impl fmt::Display for EffectiveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Role> for EffectiveRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Manager => Self::Manager,
            Role::Service => Self::Service,
            Role::Client => Self::Client,
        }
    }
}

/// Resolve the role a request acts under.
///
/// Order of precedence:
/// 1. unauthenticated → `Anonymous`;
/// 2. staff flag → `Manager`, whatever the hint says;
/// 3. a hint naming a role the caller holds → that role;
/// 4. manager membership → `Manager`;
/// 5. anything else → `Implicit`.
///
/// Hints that are empty, unknown, or name a role the caller does not hold are
/// ignored rather than rejected.
#[must_use]
pub fn resolve_effective_role(ctx: &SecurityContext, hint: Option<&str>) -> EffectiveRole {
    if !ctx.is_authenticated() {
        return EffectiveRole::Anonymous;
    }
    if ctx.is_staff() {
        return EffectiveRole::Manager;
    }

    let hinted = hint
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .and_then(|h| h.parse::<Role>().ok())
        .filter(|role| ctx.memberships().contains(*role));
    if let Some(role) = hinted {
        return role.into();
    }

    if ctx.memberships().contains(Role::Manager) {
        EffectiveRole::Manager
    } else {
        EffectiveRole::Implicit
    }
}
