use std::collections::BTreeMap;

use super::requirement::PolicyRequirement;
use crate::types::{OrgRole, Tier};

/// Operation identifiers looked up by the dispatch layer
pub mod operations {
    pub const AUTH_WHOAMI: &str = "auth.whoami";
    pub const ORGANIZATION_SHOW: &str = "organization.show";
    pub const ORGANIZATION_MEMBERS_LIST: &str = "organization.members.list";
    pub const ORGANIZATION_MEMBERS_UPDATE_ROLE: &str = "organization.members.update_role";
    pub const ORGANIZATION_SCOPE_PREVIEW: &str = "organization.scope.preview";
    pub const ORGANIZATION_PROJECTS_FIND: &str = "organization.projects.find";
    pub const ORGANIZATION_PROJECTS_SHOW: &str = "organization.projects.show";
    pub const ADMIN_ORGANIZATIONS_LIST: &str = "admin.organizations.list";
    pub const ADMIN_ORGANIZATIONS_UPDATE_TIER: &str = "admin.organizations.update_tier";
}

/// Mapping from operation id to its declared requirement, built once at startup
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: BTreeMap<String, PolicyRequirement>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, operation: impl Into<String>, requirement: PolicyRequirement) -> Self {
        let operation = operation.into();
        if self.policies.insert(operation.clone(), requirement).is_some() {
            tracing::warn!("Policy for operation '{}' registered twice, keeping the latest", operation);
        }
        self
    }

    pub fn get(&self, operation: &str) -> Option<&PolicyRequirement> {
        self.policies.get(operation)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PolicyRequirement)> {
        self.policies.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Policies for every operation served by the HTTP router
    pub fn standard() -> Self {
        use operations::*;

        Self::new()
            .register(AUTH_WHOAMI, PolicyRequirement::global())
            .register(ORGANIZATION_SHOW, PolicyRequirement::organization())
            .register(
                ORGANIZATION_MEMBERS_LIST,
                PolicyRequirement::organization().with_roles([OrgRole::Owner, OrgRole::Admin]),
            )
            .register(
                ORGANIZATION_MEMBERS_UPDATE_ROLE,
                PolicyRequirement::organization()
                    .with_roles([OrgRole::Owner, OrgRole::Admin])
                    .with_min_tier(Tier::Basic),
            )
            .register(
                ORGANIZATION_SCOPE_PREVIEW,
                PolicyRequirement::organization().with_min_tier(Tier::Professional),
            )
            .register(ORGANIZATION_PROJECTS_FIND, PolicyRequirement::organization())
            .register(ORGANIZATION_PROJECTS_SHOW, PolicyRequirement::organization())
            .register(ADMIN_ORGANIZATIONS_LIST, PolicyRequirement::admin_only())
            .register(ADMIN_ORGANIZATIONS_UPDATE_TIER, PolicyRequirement::admin_only())
    }
}
