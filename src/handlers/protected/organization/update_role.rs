// handlers/protected/organization/update_role.rs - PUT /api/organization/members/:user_id/role handler

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::Member;
use crate::database::{DirectoryAdmin, MembershipDirectory, RoleChange};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::RequestContext;
use crate::server::AppState;
use crate::types::OrgRole;

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: OrgRole,
}

/**
 * PUT /api/organization/members/:user_id/role - Explicit role change
 *
 * The target must be a member of the bound organization (404 otherwise, the
 * same answer as for an unknown user). Only an owner, or a system
 * administrator, may grant or revoke `owner`, and the last owner cannot be
 * demoted.
 */
pub async fn member_role_put(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Member> {
    let organization = ctx.require_organization()?;
    let members = state.directory.list_members(organization.organization_id).await?;
    let target = members
        .iter()
        .find(|m| m.user_id == user_id)
        .ok_or_else(|| ApiError::not_found("Member not found"))?;

    let touches_owner = payload.role == OrgRole::Owner || target.role == OrgRole::Owner;
    let caller_is_owner = organization.role == Some(OrgRole::Owner) || ctx.caller.is_super_admin();
    if touches_owner && !caller_is_owner {
        return Err(ApiError::forbidden("Only an owner can grant or revoke the owner role"));
    }

    let previous = match state
        .directory
        .set_member_role(organization.organization_id, user_id, payload.role)
        .await?
    {
        RoleChange::Updated { previous } => previous,
        RoleChange::NotMember => return Err(ApiError::not_found("Member not found")),
        RoleChange::LastOwner => return Err(ApiError::conflict("An organization must keep at least one owner")),
    };

    tracing::info!(
        "{} changed role of {} in {} from {} to {}",
        ctx.caller.user_id,
        user_id,
        organization.organization_id,
        previous,
        payload.role
    );

    Ok(ApiResponse::success(Member { role: payload.role, ..target.clone() }))
}
