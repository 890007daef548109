// handlers/protected/organization/projects.rs - scoped project reads

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::Project;
use crate::database::TenantRepository;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::RequestContext;
use crate::scope::{entity, TenantQueryScope};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct ProjectPage {
    pub items: Vec<Project>,
    pub total: i64,
}

fn projects(state: &AppState) -> Result<TenantRepository<Project>, ApiError> {
    let pool: PgPool = state
        .pool
        .clone()
        .ok_or_else(|| ApiError::service_unavailable("Database not configured"))?;
    Ok(TenantRepository::new(&entity::PROJECTS, pool))
}

/// POST /api/organization/projects/find - projects visible to the caller, filtered
pub async fn projects_find_post(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(filter): Json<FilterData>,
) -> ApiResult<ProjectPage> {
    // rows are decoded whole
    if filter.select.is_some() {
        return Err(ApiError::bad_request("Column selection is not supported for projects"));
    }
    let scope = TenantQueryScope::for_request(&ctx)?;
    let repo = projects(&state)?;

    // count ignores limit and offset, so total spans every page
    let total = repo.count(&scope, filter.clone()).await?;
    let items = repo.select_any(&scope, filter).await?;
    Ok(ApiResponse::success(ProjectPage { items, total }))
}

/// GET /api/organization/projects/:id - 404 for absent and foreign projects alike
pub async fn project_get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Project> {
    let scope = TenantQueryScope::for_request(&ctx)?;
    let project = projects(&state)?.select_404(&scope, id).await?;
    Ok(ApiResponse::success(project))
}
