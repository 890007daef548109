use serde::Serialize;
use uuid::Uuid;

use super::error::AuthzError;
use crate::database::models::{Membership, User};
use crate::types::{OrgRole, SystemRole, Tier};

/// Caller resolved from a bearer credential, with memberships read fresh for this request
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedCaller {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub system_role: SystemRole,
    pub memberships: Vec<Membership>,
}

impl AuthenticatedCaller {
    pub fn new(user: &User, memberships: Vec<Membership>) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            system_role: user.system_role,
            memberships,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.system_role.is_super_admin()
    }

    pub fn membership_in(&self, organization_id: Uuid) -> Option<&Membership> {
        self.memberships.iter().find(|m| m.organization_id == organization_id)
    }
}

/// Organization a request is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationContext {
    pub organization_id: Uuid,
    /// `None` only when a system administrator without a membership selected the organization
    pub role: Option<OrgRole>,
    pub tier: Tier,
}

impl OrganizationContext {
    /// Binds the caller's own membership. Never borrows a role from another organization.
    pub fn from_membership(membership: &Membership) -> Self {
        Self {
            organization_id: membership.organization_id,
            role: Some(membership.role),
            tier: membership.tier,
        }
    }
}

/// Everything downstream guards and handlers know about the request
#[derive(Debug, Clone, Serialize)]
pub struct RequestContext {
    pub caller: AuthenticatedCaller,
    pub organization: Option<OrganizationContext>,
}

impl RequestContext {
    pub fn new(caller: AuthenticatedCaller, organization: Option<OrganizationContext>) -> Self {
        Self { caller, organization }
    }

    /// Concrete organization for tenant-scoped work. Required even for system administrators.
    pub fn require_organization(&self) -> Result<&OrganizationContext, AuthzError> {
        self.organization.as_ref().ok_or(AuthzError::OrganizationContextMissing)
    }
}
