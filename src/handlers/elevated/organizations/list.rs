// handlers/elevated/organizations/list.rs - GET /api/admin/organizations handler

use axum::extract::State;

use crate::database::models::Organization;
use crate::database::MembershipDirectory;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

pub async fn organizations_get(State(state): State<AppState>) -> ApiResult<Vec<Organization>> {
    Ok(ApiResponse::success(state.directory.list_organizations().await?))
}
