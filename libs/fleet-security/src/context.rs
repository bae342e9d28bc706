use uuid::Uuid;

use crate::role::{EffectiveRole, RoleSet, resolve_effective_role};

/// `SecurityContext` encapsulates the security-related information for a request or operation.
///
/// Built by the authentication middleware from the bearer token and the role-hint
/// header, then passed through the request lifecycle. Domain services derive the
/// effective role and the access scope from it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SecurityContext {
    /// Subject ID of the authenticated party. `None` for anonymous callers.
    subject_id: Option<Uuid>,
    /// Username of the authenticated party.
    username: Option<String>,
    /// Staff parties act as managers unconditionally.
    #[serde(default)]
    is_staff: bool,
    /// Role memberships held by the party.
    #[serde(default)]
    memberships: RoleSet,
    /// Raw role hint as received (e.g. from the `X-Active-Role` header).
    #[serde(default)]
    role_hint: Option<String>,
}

impl SecurityContext {
    /// Create a new `SecurityContext` builder
    #[must_use]
    pub fn builder() -> SecurityContextBuilder {
        SecurityContextBuilder::default()
    }

    /// Create an anonymous `SecurityContext` with no subject and no memberships
    #[must_use]
    pub fn anonymous() -> Self {
        SecurityContextBuilder::default().build()
    }

    /// Context used by administrative jobs. Acts as staff.
    #[must_use]
    pub fn system() -> Self {
        SecurityContextBuilder::default()
            .subject_id(Uuid::nil())
            .username("system")
            .staff(true)
            .build()
    }

    #[must_use]
    pub fn subject_id(&self) -> Option<Uuid> {
        self.subject_id
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.subject_id.is_some()
    }

    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.is_staff
    }

    #[must_use]
    pub fn memberships(&self) -> &RoleSet {
        &self.memberships
    }

    #[must_use]
    pub fn role_hint(&self) -> Option<&str> {
        self.role_hint.as_deref()
    }

    /// Effective role for this context, honouring the stored role hint.
    #[must_use]
    pub fn effective_role(&self) -> EffectiveRole {
        resolve_effective_role(self, self.role_hint.as_deref())
    }
}

#[derive(Default)]
pub struct SecurityContextBuilder {
    subject_id: Option<Uuid>,
    username: Option<String>,
    is_staff: bool,
    memberships: RoleSet,
    role_hint: Option<String>,
}

impl SecurityContextBuilder {
    #[must_use]
    pub fn subject_id(mut self, subject_id: Uuid) -> Self {
        self.subject_id = Some(subject_id);
        self
    }

    #[must_use]
    pub fn username(mut self, username: &str) -> Self {
        self.username = Some(username.to_owned());
        self
    }

    #[must_use]
    pub fn staff(mut self, is_staff: bool) -> Self {
        self.is_staff = is_staff;
        self
    }

    #[must_use]
    pub fn memberships(mut self, memberships: RoleSet) -> Self {
        self.memberships = memberships;
        self
    }

    #[must_use]
    pub fn role_hint(mut self, hint: Option<&str>) -> Self {
        self.role_hint = hint.map(str::to_owned);
        self
    }

    #[must_use]
    pub fn build(self) -> SecurityContext {
        SecurityContext {
            subject_id: self.subject_id,
            username: self.username,
            is_staff: self.is_staff,
            memberships: self.memberships,
            role_hint: self.role_hint,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::role::Role;

    #[test]
    fn test_security_context_builder_full() {
        let subject_id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap();

        let ctx = SecurityContext::builder()
            .subject_id(subject_id)
            .username("acme-service")
            .memberships(RoleSet::from([Role::Service]))
            .role_hint(Some("service"))
            .build();

        assert_eq!(ctx.subject_id(), Some(subject_id));
        assert_eq!(ctx.username(), Some("acme-service"));
        assert!(ctx.is_authenticated());
        assert!(!ctx.is_staff());
        assert!(ctx.memberships().contains(Role::Service));
        assert_eq!(ctx.role_hint(), Some("service"));
        assert_eq!(ctx.effective_role(), EffectiveRole::Service);
    }

    #[test]
    fn test_anonymous_context() {
        let ctx = SecurityContext::anonymous();
        assert!(!ctx.is_authenticated());
        assert_eq!(ctx.username(), None);
        assert!(ctx.memberships().is_empty());
        assert_eq!(ctx.effective_role(), EffectiveRole::Anonymous);
    }

    #[test]
    fn test_system_context_is_manager() {
        let ctx = SecurityContext::system();
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.subject_id(), Some(Uuid::nil()));
        assert_eq!(ctx.effective_role(), EffectiveRole::Manager);
    }

    #[test]
    fn test_serialize_roundtrip_keeps_memberships() {
        let ctx = SecurityContext::builder()
            .subject_id(Uuid::new_v4())
            .memberships(RoleSet::from([Role::Client, Role::Service]))
            .build();

        let json = serde_json::to_string(&ctx).unwrap();
        let back: SecurityContext = serde_json::from_str(&json).unwrap();

        assert_eq!(back.subject_id(), ctx.subject_id());
        assert_eq!(back.memberships(), ctx.memberships());
        assert_eq!(back.effective_role(), EffectiveRole::Implicit);
    }
}
