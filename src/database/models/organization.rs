use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::{Tier, TierLimits};

#[derive(Debug, Clone, Serialize)]
pub struct Organization {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub tier: Tier,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub fn limits(&self) -> TierLimits {
        self.tier.limits()
    }
}
