// handlers/protected/auth/whoami.rs - GET /api/auth/whoami handler

use axum::Extension;
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::Membership;
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::{OrganizationContext, RequestContext};
use crate::types::SystemRole;

#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub system_role: SystemRole,
    pub memberships: Vec<Membership>,
    /// Present only when the request selected an organization
    pub organization: Option<OrganizationContext>,
}

pub async fn whoami_get(Extension(ctx): Extension<RequestContext>) -> ApiResult<WhoamiResponse> {
    let RequestContext { caller, organization } = ctx;
    Ok(ApiResponse::success(WhoamiResponse {
        id: caller.user_id,
        email: caller.email,
        name: caller.name,
        system_role: caller.system_role,
        memberships: caller.memberships,
        organization,
    }))
}
