// handlers/public/auth/login.rs - POST /auth/login handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::password::verify_password;
use crate::database::MembershipDirectory;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user_id: Uuid,
}

/**
 * POST /auth/login - Exchange email and password for a bearer token
 *
 * Unknown emails, deactivated users and wrong passwords all produce the same
 * 401 so the response never reveals which accounts exist. The token carries
 * only the user id; roles and memberships are resolved per request.
 */
pub async fn login_post(State(state): State<AppState>, Json(payload): Json<LoginRequest>) -> ApiResult<LoginResponse> {
    let rejected = || ApiError::unauthorized("Invalid email or password");

    let user = state
        .directory
        .find_user_by_email(payload.email.trim())
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(rejected)?;

    let verified = verify_password(&payload.password, &user.password_hash).unwrap_or_else(|e| {
        tracing::error!("Stored credential for {} is unreadable: {}", user.id, e);
        false
    });
    if !verified {
        tracing::warn!("Failed login for {}", user.id);
        return Err(rejected());
    }

    let token = state.tokens.issue(user.id).map_err(|e| {
        tracing::error!("Failed to issue token: {}", e);
        ApiError::internal_server_error("Failed to issue token")
    })?;

    tracing::info!("User {} logged in", user.id);
    Ok(ApiResponse::success(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in: state.tokens.expires_in_seconds(),
        user_id: user.id,
    }))
}
