//! Pure policy checks evaluated against the bound request context.
//!
//! Each guard is a plain function of (context, requirement) with no I/O, so the
//! pipeline can be unit-tested in isolation and composed in any order.

use super::context::RequestContext;
use super::error::AuthzError;
use super::requirement::{OperationScope, PolicyRequirement};

pub type Guard = fn(&RequestContext, &PolicyRequirement) -> Result<(), AuthzError>;

/// Ordered pipeline run by the dispatch layer after the organization is resolved
pub const GUARD_PIPELINE: [Guard; 3] = [check_scope, check_role, check_tier];

pub fn evaluate(ctx: &RequestContext, requirement: &PolicyRequirement) -> Result<(), AuthzError> {
    GUARD_PIPELINE.iter().try_for_each(|guard| guard(ctx, requirement))
}

/// Organization operations need a bound organization (admins too); admin-only needs a super admin
pub fn check_scope(ctx: &RequestContext, requirement: &PolicyRequirement) -> Result<(), AuthzError> {
    match requirement.scope {
        OperationScope::Global => Ok(()),
        OperationScope::AdminOnly if ctx.caller.is_super_admin() => Ok(()),
        OperationScope::AdminOnly => Err(AuthzError::SystemAdminRequired),
        OperationScope::Organization => ctx.require_organization().map(|_| ()),
    }
}

pub fn check_role(ctx: &RequestContext, requirement: &PolicyRequirement) -> Result<(), AuthzError> {
    let Some(allowed) = requirement.roles.as_ref() else {
        return Ok(());
    };
    if ctx.caller.is_super_admin() {
        return Ok(());
    }

    let organization = ctx.require_organization()?;
    match organization.role {
        Some(role) if allowed.contains(&role) => Ok(()),
        _ => Err(AuthzError::InsufficientRole { allowed: requirement.allowed_roles() }),
    }
}

pub fn check_tier(ctx: &RequestContext, requirement: &PolicyRequirement) -> Result<(), AuthzError> {
    let Some(required) = requirement.min_tier else {
        return Ok(());
    };
    if ctx.caller.is_super_admin() {
        return Ok(());
    }

    let organization = ctx.require_organization()?;
    if organization.tier.satisfies(required) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientTier { required, actual: organization.tier })
    }
}
