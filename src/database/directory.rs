use async_trait::async_trait;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{Member, Membership, Organization, User};
use crate::types::{OrgRole, Tier};

/// Read path over users, organizations and memberships.
///
/// Implementations must not cache memberships across calls: every request
/// reads roles and tiers fresh so a change applies on the next request.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, DatabaseError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    /// Memberships in active organizations only
    async fn memberships_for(&self, user_id: Uuid) -> Result<Vec<Membership>, DatabaseError>;

    /// Active organization by id
    async fn find_organization(&self, organization_id: Uuid) -> Result<Option<Organization>, DatabaseError>;

    async fn list_members(&self, organization_id: Uuid) -> Result<Vec<Member>, DatabaseError>;

    async fn list_organizations(&self) -> Result<Vec<Organization>, DatabaseError>;
}

/// Outcome of [`DirectoryAdmin::set_member_role`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Updated { previous: OrgRole },
    NotMember,
    /// Refused: the change would leave the organization without an owner
    LastOwner,
}

/// Explicit administrative mutations. The authorization core never calls these implicitly.
#[async_trait]
pub trait DirectoryAdmin: Send + Sync {
    /// Checks the last-owner rule and writes the role as one atomic step
    async fn set_member_role(&self, organization_id: Uuid, user_id: Uuid, role: OrgRole) -> Result<RoleChange, DatabaseError>;

    /// Returns false when the organization does not exist
    async fn set_organization_tier(&self, organization_id: Uuid, tier: Tier) -> Result<bool, DatabaseError>;
}

pub trait Directory: MembershipDirectory + DirectoryAdmin {}

impl<T: MembershipDirectory + DirectoryAdmin> Directory for T {}
