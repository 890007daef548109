use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post, put, MethodRouter},
    Router,
};
use sqlx::PgPool;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::TokenService;
use crate::config::{AppConfig, SecurityConfig};
use crate::database::Directory;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{authorize, Guarded};
use crate::policy::{operations, PolicyRegistry};

/// Shared state handed to every handler and to the authorize middleware
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn Directory>,
    pub policies: Arc<PolicyRegistry>,
    pub tokens: TokenService,
    pub organization_header: String,
    pub audit_logging: bool,
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(directory: Arc<dyn Directory>, config: &AppConfig) -> Self {
        Self {
            directory,
            policies: Arc::new(PolicyRegistry::standard()),
            tokens: TokenService::from_config(&config.security),
            organization_header: config.security.organization_header.clone(),
            audit_logging: config.security.enable_audit_logging,
            pool: None,
        }
    }

    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }
}

/// Attach the authorize middleware for `operation` to a route
fn guarded(state: &AppState, operation: &'static str, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    let guard = Guarded { state: state.clone(), operation };
    route.route_layer(middleware::from_fn_with_state(guard, authorize))
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    use operations::*;

    let router = Router::new()
        // Public
        .route("/health", get(public::health_get))
        .route("/auth/login", post(public::login_post))
        // Protected
        .route("/api/auth/whoami", guarded(&state, AUTH_WHOAMI, get(protected::auth::whoami_get)))
        .route(
            "/api/organization",
            guarded(&state, ORGANIZATION_SHOW, get(protected::organization::organization_get)),
        )
        .route(
            "/api/organization/members",
            guarded(&state, ORGANIZATION_MEMBERS_LIST, get(protected::organization::members_get)),
        )
        .route(
            "/api/organization/members/:user_id/role",
            guarded(&state, ORGANIZATION_MEMBERS_UPDATE_ROLE, put(protected::organization::member_role_put)),
        )
        .route(
            "/api/organization/scope/preview",
            guarded(&state, ORGANIZATION_SCOPE_PREVIEW, post(protected::organization::scope_preview_post)),
        )
        .route(
            "/api/organization/projects/find",
            guarded(&state, ORGANIZATION_PROJECTS_FIND, post(protected::organization::projects_find_post)),
        )
        .route(
            "/api/organization/projects/:id",
            guarded(&state, ORGANIZATION_PROJECTS_SHOW, get(protected::organization::project_get)),
        )
        // Elevated
        .route(
            "/api/admin/organizations",
            guarded(&state, ADMIN_ORGANIZATIONS_LIST, get(elevated::organizations::organizations_get)),
        )
        .route(
            "/api/admin/organizations/:id/tier",
            guarded(&state, ADMIN_ORGANIZATIONS_UPDATE_TIER, put(elevated::organizations::organization_tier_put)),
        )
        .with_state(state);

    let router = if config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    if config.security.enable_cors {
        router.layer(cors_layer(&config.security))
    } else {
        router
    }
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::database::models::User;
    use crate::testing::{Fixture, PASSWORD};
    use crate::types::{OrgRole, Tier};

    struct Call<'a> {
        method: Method,
        uri: String,
        user: Option<&'a User>,
        organization: Option<Uuid>,
        body: Option<Value>,
    }

    impl<'a> Call<'a> {
        fn new(method: Method, uri: impl Into<String>) -> Self {
            Self { method, uri: uri.into(), user: None, organization: None, body: None }
        }

        fn as_user(mut self, user: &'a User) -> Self {
            self.user = Some(user);
            self
        }

        fn in_org(mut self, organization_id: Uuid) -> Self {
            self.organization = Some(organization_id);
            self
        }

        fn json(mut self, body: Value) -> Self {
            self.body = Some(body);
            self
        }
    }

    async fn send(fixture: &Fixture, call: Call<'_>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(call.method).uri(call.uri);
        if let Some(user) = call.user {
            builder = builder.header("authorization", format!("Bearer {}", fixture.token_for(user)));
        }
        if let Some(org) = call.organization {
            builder = builder.header("x-organization-id", org.to_string());
        }
        let body = match call.body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let config = crate::config::AppConfig::from_env();
        let response = app(fixture.state(), &config).oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn missing_credential_is_401_not_403() {
        let fixture = Fixture::new();
        let (status, body) = send(&fixture, Call::new(Method::GET, "/api/organization").in_org(fixture.org_a.id)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn member_of_basic_organization() {
        let fixture = Fixture::new();
        let org_a = fixture.org_a.id;

        // No role or tier requirement: admitted
        let (status, body) = send(&fixture, Call::new(Method::GET, "/api/organization").as_user(&fixture.member).in_org(org_a)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["role"], "member");
        assert_eq!(body["data"]["organization"]["tier"], "basic");

        // Requires owner or admin
        let (status, body) =
            send(&fixture, Call::new(Method::GET, "/api/organization/members").as_user(&fixture.member).in_org(org_a)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "INSUFFICIENT_ROLE");
        assert_eq!(body["allowed_roles"], json!(["owner", "admin"]));

        // Organization the caller does not belong to
        let (status, body) =
            send(&fixture, Call::new(Method::GET, "/api/organization").as_user(&fixture.member).in_org(fixture.org_b.id)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ORGANIZATION_MEMBERSHIP_MISSING");

        // Requires professional
        let (status, body) = send(
            &fixture,
            Call::new(Method::POST, "/api/organization/scope/preview")
                .as_user(&fixture.member)
                .in_org(org_a)
                .json(json!({ "entity": "projects" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "INSUFFICIENT_TIER");
        assert_eq!(body["required_tier"], "professional");
        assert_eq!(body["current_tier"], "basic");
    }

    #[tokio::test]
    async fn organization_operation_without_selector() {
        let fixture = Fixture::new();
        let (status, body) = send(&fixture, Call::new(Method::GET, "/api/organization").as_user(&fixture.member)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ORGANIZATION_CONTEXT_MISSING");

        // Selector may also come from the query string
        let uri = format!("/api/organization?organization_id={}", fixture.org_a.id);
        let (status, _) = send(&fixture, Call::new(Method::GET, uri).as_user(&fixture.member)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn whoami_needs_no_organization() {
        let fixture = Fixture::new();
        let (status, body) = send(&fixture, Call::new(Method::GET, "/api/auth/whoami").as_user(&fixture.member)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], fixture.member.id.to_string());
        assert_eq!(body["data"]["organization"], Value::Null);
    }

    #[tokio::test]
    async fn tier_upgrade_applies_on_next_request() {
        let fixture = Fixture::new();
        let preview = || {
            Call::new(Method::POST, "/api/organization/scope/preview")
                .as_user(&fixture.member)
                .in_org(fixture.org_a.id)
                .json(json!({ "entity": "projects", "filter": { "where": { "status": "open" } } }))
        };

        let (status, _) = send(&fixture, preview()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        fixture.directory.set_tier(fixture.org_a.id, Tier::Professional);
        let (status, body) = send(&fixture, preview()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["organization_wide"], false);
        let params = body["data"]["params"].as_array().unwrap();
        assert_eq!(params[0], fixture.org_a.id.to_string());
        assert_eq!(params.last().unwrap(), "open");
    }

    #[tokio::test]
    async fn login_issues_usable_token() {
        let fixture = Fixture::new();
        let (status, body) = send(
            &fixture,
            Call::new(Method::POST, "/auth/login").json(json!({ "email": "U@acme.test", "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["token_type"], "Bearer");
        let claims = fixture.tokens.verify(body["data"]["token"].as_str().unwrap()).unwrap();
        assert_eq!(claims.sub, fixture.member.id);

        let (status, body) = send(
            &fixture,
            Call::new(Method::POST, "/auth/login").json(json!({ "email": "u@acme.test", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");

        let (status, _) = send(
            &fixture,
            Call::new(Method::POST, "/auth/login").json(json!({ "email": "nobody@acme.test", "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_require_system_admin() {
        let fixture = Fixture::new();
        let (status, body) = send(&fixture, Call::new(Method::GET, "/api/admin/organizations").as_user(&fixture.owner)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "SYSTEM_ADMIN_REQUIRED");

        let (status, body) = send(&fixture, Call::new(Method::GET, "/api/admin/organizations").as_user(&fixture.admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let uri = format!("/api/admin/organizations/{}/tier", fixture.org_a.id);
        let (status, body) = send(
            &fixture,
            Call::new(Method::PUT, uri).as_user(&fixture.admin).json(json!({ "tier": "enterprise" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["tier"], "enterprise");
    }

    #[tokio::test]
    async fn admin_still_needs_selector_for_organization_operations() {
        let fixture = Fixture::new();
        let (status, body) = send(&fixture, Call::new(Method::GET, "/api/organization/members").as_user(&fixture.admin)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ORGANIZATION_CONTEXT_MISSING");

        let (status, body) = send(
            &fixture,
            Call::new(Method::GET, "/api/organization/members").as_user(&fixture.admin).in_org(fixture.org_a.id),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn role_changes_follow_owner_rules() {
        let fixture = Fixture::new();
        let org_a = fixture.org_a.id;
        let admin_user = fixture.directory.add_user("lead@acme.test", crate::types::SystemRole::Member);
        fixture.directory.add_membership(admin_user.id, org_a, OrgRole::Admin);
        let role_uri = |user: &User| format!("/api/organization/members/{}/role", user.id);

        // An org admin cannot hand out owner
        let (status, body) = send(
            &fixture,
            Call::new(Method::PUT, role_uri(&fixture.member)).as_user(&admin_user).in_org(org_a).json(json!({ "role": "owner" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");

        // But can change non-owner roles
        let (status, body) = send(
            &fixture,
            Call::new(Method::PUT, role_uri(&fixture.member)).as_user(&admin_user).in_org(org_a).json(json!({ "role": "viewer" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["role"], "viewer");
        assert_eq!(fixture.directory.role_of(fixture.member.id, org_a), Some(OrgRole::Viewer));

        // The last owner cannot step down
        let (status, body) = send(
            &fixture,
            Call::new(Method::PUT, role_uri(&fixture.owner)).as_user(&fixture.owner).in_org(org_a).json(json!({ "role": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        // Non-members of the bound organization look the same as unknown users
        let (status, _) = send(
            &fixture,
            Call::new(Method::PUT, role_uri(&fixture.admin)).as_user(&fixture.owner).in_org(org_a).json(json!({ "role": "viewer" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn role_change_is_visible_on_next_request() {
        let fixture = Fixture::new();
        let org_a = fixture.org_a.id;
        let members = || Call::new(Method::GET, "/api/organization/members").as_user(&fixture.member).in_org(org_a);

        let (status, _) = send(&fixture, members()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let uri = format!("/api/organization/members/{}/role", fixture.member.id);
        let (status, _) = send(
            &fixture,
            Call::new(Method::PUT, uri).as_user(&fixture.owner).in_org(org_a).json(json!({ "role": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&fixture, members()).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn project_reads_are_scoped_before_touching_storage() {
        let fixture = Fixture::new();
        let id = Uuid::new_v4();
        let show = |org: Uuid| Call::new(Method::GET, format!("/api/organization/projects/{}", id)).as_user(&fixture.member).in_org(org);

        // Foreign organization is refused by the guard
        let (status, _) = send(&fixture, show(fixture.org_b.id)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Own organization passes the guard; no pool is configured in tests
        let (status, body) = send(&fixture, show(fixture.org_a.id)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "SERVICE_UNAVAILABLE");

        let find = Call::new(Method::POST, "/api/organization/projects/find")
            .as_user(&fixture.member)
            .in_org(fixture.org_a.id)
            .json(json!({ "where": { "name": "Roadmap" }, "limit": 10 }));
        let (status, _) = send(&fixture, find).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn project_find_rejects_column_selection() {
        let fixture = Fixture::new();
        let find = Call::new(Method::POST, "/api/organization/projects/find")
            .as_user(&fixture.member)
            .in_org(fixture.org_a.id)
            .json(json!({ "select": ["name"] }));
        let (status, body) = send(&fixture, find).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn serves_with_request_logging_disabled() {
        let fixture = Fixture::new();
        let mut config = crate::config::AppConfig::from_env();
        config.api.enable_request_logging = false;
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app(fixture.state(), &config).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
