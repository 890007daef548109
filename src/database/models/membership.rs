use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::{OrgRole, Tier};

/// One (user, organization) membership as seen from the user's side.
/// `tier` is the organization's current tier, read alongside the role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Membership {
    pub organization_id: Uuid,
    pub organization_slug: String,
    pub role: OrgRole,
    pub tier: Tier,
}

/// One member as seen from the organization's side
#[derive(Debug, Clone, Serialize)]
pub struct Member {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: OrgRole,
    pub joined_at: DateTime<Utc>,
}
