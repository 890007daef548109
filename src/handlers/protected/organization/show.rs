// handlers/protected/organization/show.rs - GET /api/organization handler

use axum::{extract::State, Extension};
use serde::Serialize;

use crate::database::models::Organization;
use crate::database::MembershipDirectory;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::RequestContext;
use crate::server::AppState;
use crate::types::{OrgRole, TierLimits};

#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    pub organization: Organization,
    pub role: Option<OrgRole>,
    pub limits: TierLimits,
}

/// The bound organization with the caller's role and the tier's limits
pub async fn organization_get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> ApiResult<OrganizationResponse> {
    let bound = ctx.require_organization()?;
    let organization = state
        .directory
        .find_organization(bound.organization_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    Ok(ApiResponse::success(OrganizationResponse {
        limits: organization.limits(),
        role: bound.role,
        organization,
    }))
}
