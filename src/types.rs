/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Global role of a user, orthogonal to any organization role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SystemRole {
    Member,
    SuperAdmin,
}

impl SystemRole {
    pub fn is_super_admin(&self) -> bool {
        matches!(self, SystemRole::SuperAdmin)
    }
}

/// Role a user holds inside one organization
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrgRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

/// Subscription tier. Declaration order is the rank: `Free < Basic < Professional < Enterprise`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tier {
    Free,
    Basic,
    Professional,
    Enterprise,
}

/// Seat and resource ceilings derived from a tier. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierLimits {
    pub max_members: Option<u32>,
    pub max_projects: Option<u32>,
    pub storage_mb: Option<u64>,
}

impl Tier {
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// True when this tier is at least `required`
    pub fn satisfies(&self, required: Tier) -> bool {
        self.rank() >= required.rank()
    }

    pub fn limits(&self) -> TierLimits {
        match self {
            Tier::Free => TierLimits { max_members: Some(3), max_projects: Some(3), storage_mb: Some(500) },
            Tier::Basic => TierLimits { max_members: Some(10), max_projects: Some(20), storage_mb: Some(5_000) },
            Tier::Professional => TierLimits { max_members: Some(50), max_projects: None, storage_mb: Some(50_000) },
            Tier::Enterprise => TierLimits { max_members: None, max_projects: None, storage_mb: None },
        }
    }
}
