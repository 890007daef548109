use uuid::Uuid;

use super::entity::EntityScope;
use super::predicate::{PeerGrantRow, Predicate, ScopedRow};
use crate::filter::SqlResult;
use crate::policy::{AuthenticatedCaller, AuthzError, RequestContext};

/// Row visibility for one caller inside one organization.
///
/// The organization clause is always present. Regular callers additionally see
/// only rows they own or hold an organization-scoped peer grant for; system
/// administrators see every row of the bound organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantQueryScope {
    organization_id: Uuid,
    caller_id: Uuid,
    organization_wide: bool,
}

/// Unscoped visibility across all organizations. Only obtainable by a system administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossTenantScope {
    granted_to: Uuid,
}

impl TenantQueryScope {
    /// Owner-or-peer visibility for `caller_id` within `organization_id`
    pub fn new(organization_id: Uuid, caller_id: Uuid) -> Self {
        Self { organization_id, caller_id, organization_wide: false }
    }

    /// Scope for the request's bound organization
    pub fn for_request(ctx: &RequestContext) -> Result<Self, AuthzError> {
        let organization = ctx.require_organization()?;
        Ok(Self {
            organization_id: organization.organization_id,
            caller_id: ctx.caller.user_id,
            organization_wide: ctx.caller.is_super_admin(),
        })
    }

    pub fn cross_tenant(caller: &AuthenticatedCaller) -> Result<CrossTenantScope, AuthzError> {
        if caller.is_super_admin() {
            tracing::info!("Cross-tenant scope granted to {}", caller.user_id);
            Ok(CrossTenantScope { granted_to: caller.user_id })
        } else {
            Err(AuthzError::SystemAdminRequired)
        }
    }

    pub fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    pub fn caller_id(&self) -> Uuid {
        self.caller_id
    }

    pub fn is_organization_wide(&self) -> bool {
        self.organization_wide
    }

    pub fn predicate(&self) -> Predicate {
        let organization = Predicate::OrganizationIs(self.organization_id);
        if self.organization_wide {
            return Predicate::And(vec![organization]);
        }
        Predicate::And(vec![
            organization,
            Predicate::Or(vec![
                Predicate::OwnerIs(self.caller_id),
                Predicate::PeerGrant { user_id: self.caller_id, organization_id: self.organization_id },
            ]),
        ])
    }

    /// Scope condition for `entity` with placeholders starting at `$1`
    pub fn to_sql(&self, entity: &EntityScope) -> SqlResult {
        let mut params = vec![];
        let query = self.predicate().to_sql(entity, &mut params);
        SqlResult { query, params }
    }

    pub fn admits(&self, entity: &EntityScope, row: &ScopedRow, grants: &[PeerGrantRow]) -> bool {
        self.predicate().admits(entity, row, grants)
    }
}

impl CrossTenantScope {
    pub fn granted_to(&self) -> Uuid {
        self.granted_to
    }

    pub fn predicate(&self) -> Predicate {
        Predicate::Always
    }
}
