use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};

use super::identity::{bearer_token, resolve_identity, ResolveError};
use super::organization::{organization_selector, resolve_organization};
use crate::error::ApiError;
use crate::policy::{guard, OperationScope, PolicyRequirement, RequestContext};
use crate::server::AppState;

/// Middleware state: the shared app state plus the operation the route serves
#[derive(Clone)]
pub struct Guarded {
    pub state: AppState,
    pub operation: &'static str,
}

/// Dispatch-layer authorization for one operation.
///
/// Looks up the declared requirement, resolves identity then organization,
/// runs the guard pipeline and hands the bound `RequestContext` to the handler
/// as a request extension.
pub async fn authorize(State(guarded): State<Guarded>, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let state = &guarded.state;
    let Some(requirement) = state.policies.get(guarded.operation) else {
        error!("No policy declared for operation '{}'", guarded.operation);
        return Err(ApiError::internal_server_error("Operation is not available"));
    };

    match authorize_request(state, requirement, request.headers(), request.uri().query()).await {
        Ok(ctx) => {
            debug!("Authorized {} for {}", guarded.operation, ctx.caller.user_id);
            request.extensions_mut().insert(ctx);
            Ok(next.run(request).await)
        }
        Err(ResolveError::Denied(denied)) => {
            if state.audit_logging {
                warn!(
                    target: "audit",
                    operation = guarded.operation,
                    code = denied.code(),
                    path = %request.uri().path(),
                    "Access denied: {}",
                    denied
                );
            } else {
                debug!("Denied {}: {}", guarded.operation, denied.code());
            }
            Err(denied.into())
        }
        Err(other) => Err(other.into()),
    }
}

/// Identity, organization and guards for one request, without the HTTP plumbing
pub async fn authorize_request(
    state: &AppState,
    requirement: &PolicyRequirement,
    headers: &HeaderMap,
    query: Option<&str>,
) -> Result<RequestContext, ResolveError> {
    let caller = resolve_identity(state.directory.as_ref(), &state.tokens, bearer_token(headers)).await?;

    let selector = organization_selector(headers, query, &state.organization_header);
    // Global and admin-only operations bind an organization only when one is selected
    let organization = if requirement.scope == OperationScope::Organization || selector.is_some() {
        resolve_organization(state.directory.as_ref(), &caller, selector.as_deref()).await?
    } else {
        None
    };

    let ctx = RequestContext::new(caller, organization);
    guard::evaluate(&ctx, requirement)?;
    Ok(ctx)
}
