// handlers/elevated/organizations/update_tier.rs - PUT /api/admin/organizations/:id/tier handler

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::DirectoryAdmin;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::RequestContext;
use crate::server::AppState;
use crate::types::{Tier, TierLimits};

#[derive(Debug, Deserialize)]
pub struct UpdateTierRequest {
    pub tier: Tier,
}

#[derive(Debug, Serialize)]
pub struct UpdateTierResponse {
    pub organization_id: Uuid,
    pub tier: Tier,
    pub limits: TierLimits,
}

/// Takes effect on the next request of every member: tiers are never cached
pub async fn organization_tier_put(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(organization_id): Path<Uuid>,
    Json(payload): Json<UpdateTierRequest>,
) -> ApiResult<UpdateTierResponse> {
    if !state.directory.set_organization_tier(organization_id, payload.tier).await? {
        return Err(ApiError::not_found("Organization not found"));
    }

    tracing::info!("{} set tier of {} to {}", ctx.caller.user_id, organization_id, payload.tier);
    Ok(ApiResponse::success(UpdateTierResponse {
        organization_id,
        tier: payload.tier,
        limits: payload.tier.limits(),
    }))
}
