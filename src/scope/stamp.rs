use serde_json::{Map, Value};

use crate::policy::OrganizationContext;

pub const ORGANIZATION_COLUMN: &str = "organization_id";

/// Stamp an insert payload with the bound organization, discarding any client value
pub fn stamp_insert(mut payload: Map<String, Value>, organization: &OrganizationContext) -> Map<String, Value> {
    if let Some(supplied) = payload.get(ORGANIZATION_COLUMN) {
        if supplied.as_str() != Some(organization.organization_id.to_string().as_str()) {
            tracing::warn!("Discarding client-supplied {} on insert", ORGANIZATION_COLUMN);
        }
    }
    payload.insert(
        ORGANIZATION_COLUMN.to_string(),
        Value::String(organization.organization_id.to_string()),
    );
    payload
}

/// Remove immutable tenant columns from an update payload
pub fn strip_immutable(mut payload: Map<String, Value>) -> Map<String, Value> {
    if payload.remove(ORGANIZATION_COLUMN).is_some() {
        tracing::warn!("Ignoring attempt to change {} on update", ORGANIZATION_COLUMN);
    }
    payload
}
