// handlers/protected/organization/members.rs - GET /api/organization/members handler

use axum::{extract::State, Extension};

use crate::database::models::Member;
use crate::database::MembershipDirectory;
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::RequestContext;
use crate::server::AppState;

pub async fn members_get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> ApiResult<Vec<Member>> {
    let organization = ctx.require_organization()?;
    let members = state.directory.list_members(organization.organization_id).await?;
    Ok(ApiResponse::success(members))
}
