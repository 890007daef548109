// handlers/protected/organization/scope_preview.rs - POST /api/organization/scope/preview handler

use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::ScopedQuery;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::RequestContext;
use crate::scope::{entity, TenantQueryScope};

#[derive(Debug, Deserialize)]
pub struct ScopePreviewRequest {
    pub entity: String,
    #[serde(default)]
    pub filter: FilterData,
}

#[derive(Debug, Serialize)]
pub struct ScopePreviewResponse {
    pub entity: &'static str,
    pub organization_wide: bool,
    pub sql: String,
    pub params: Vec<Value>,
}

/// Render, without running, the query a collaborator would issue for `entity`
pub async fn scope_preview_post(
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<ScopePreviewRequest>,
) -> ApiResult<ScopePreviewResponse> {
    let entity = entity::lookup(&payload.entity)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown entity '{}'", payload.entity)))?;
    let scope = TenantQueryScope::for_request(&ctx)?;

    let rendered = ScopedQuery::<()>::new(entity, &scope).filter(payload.filter)?.to_sql()?;

    Ok(ApiResponse::success(ScopePreviewResponse {
        entity: entity.table,
        organization_wide: scope.is_organization_wide(),
        sql: rendered.query,
        params: rendered.params,
    }))
}
