use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::SystemRole;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub system_role: SystemRole,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
