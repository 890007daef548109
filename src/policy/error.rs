use thiserror::Error;

use crate::types::{OrgRole, Tier};

/// Guard-level denials. Terminal for the request: denied, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("An organization must be selected for this operation")]
    OrganizationContextMissing,

    /// Identical whether the organization exists or not
    #[error("You are not a member of the selected organization")]
    OrganizationMembershipMissing,

    #[error("This operation requires one of the roles: {}", format_roles(.allowed))]
    InsufficientRole { allowed: Vec<OrgRole> },

    #[error("This feature requires the {required} plan or higher")]
    InsufficientTier { required: Tier, actual: Tier },

    #[error("This operation is restricted to system administrators")]
    SystemAdminRequired,
}

impl AuthzError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthzError::Unauthenticated => "UNAUTHENTICATED",
            AuthzError::OrganizationContextMissing => "ORGANIZATION_CONTEXT_MISSING",
            AuthzError::OrganizationMembershipMissing => "ORGANIZATION_MEMBERSHIP_MISSING",
            AuthzError::InsufficientRole { .. } => "INSUFFICIENT_ROLE",
            AuthzError::InsufficientTier { .. } => "INSUFFICIENT_TIER",
            AuthzError::SystemAdminRequired => "SYSTEM_ADMIN_REQUIRED",
        }
    }

    /// Distinguishes "not authenticated" from "authenticated but not authorized"
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, AuthzError::Unauthenticated)
    }
}

fn format_roles(roles: &[OrgRole]) -> String {
    roles.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ")
}
