use std::collections::BTreeSet;

use serde::Serialize;

use crate::types::{OrgRole, Tier};

/// Where an operation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationScope {
    /// Needs a bound organization context, admins included
    Organization,
    /// Any authenticated caller, no organization needed
    Global,
    /// System administrators only, no organization needed
    AdminOnly,
}

/// Declared precondition of one operation.
///
/// `roles == None` and `min_tier == None` means "no restriction beyond the
/// operation scope". The role set is a set: declaration order is irrelevant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyRequirement {
    pub scope: OperationScope,
    pub roles: Option<BTreeSet<OrgRole>>,
    pub min_tier: Option<Tier>,
}

impl PolicyRequirement {
    pub fn organization() -> Self {
        Self { scope: OperationScope::Organization, roles: None, min_tier: None }
    }

    pub fn global() -> Self {
        Self { scope: OperationScope::Global, roles: None, min_tier: None }
    }

    pub fn admin_only() -> Self {
        Self { scope: OperationScope::AdminOnly, roles: None, min_tier: None }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = OrgRole>) -> Self {
        self.roles = Some(roles.into_iter().collect());
        self
    }

    pub fn with_min_tier(mut self, tier: Tier) -> Self {
        self.min_tier = Some(tier);
        self
    }

    pub fn allowed_roles(&self) -> Vec<OrgRole> {
        self.roles.as_ref().map(|r| r.iter().copied().collect()).unwrap_or_default()
    }
}
