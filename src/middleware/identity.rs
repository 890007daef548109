use axum::http::{header::AUTHORIZATION, HeaderMap};
use thiserror::Error;

use crate::auth::TokenService;
use crate::database::{DatabaseError, MembershipDirectory};
use crate::error::ApiError;
use crate::policy::{AuthenticatedCaller, AuthzError};

/// Why a request could not be bound to a caller or an organization
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Denied(#[from] AuthzError),

    #[error(transparent)]
    Directory(#[from] DatabaseError),
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Denied(denied) => ApiError::Denied(denied),
            ResolveError::Directory(db) => db.into(),
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Turn a bearer credential into a caller with memberships read fresh.
///
/// Missing, malformed or expired credentials, unknown users and deactivated
/// users are all `Unauthenticated`.
pub async fn resolve_identity<D>(
    directory: &D,
    tokens: &TokenService,
    token: Option<&str>,
) -> Result<AuthenticatedCaller, ResolveError>
where
    D: MembershipDirectory + ?Sized,
{
    let token = token.ok_or(AuthzError::Unauthenticated)?;
    let claims = tokens.verify(token).map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        AuthzError::Unauthenticated
    })?;

    let user = match directory.find_user(claims.sub).await? {
        Some(user) if user.is_active => user,
        Some(_) => {
            tracing::debug!("Token subject {} is deactivated", claims.sub);
            return Err(AuthzError::Unauthenticated.into());
        }
        None => return Err(AuthzError::Unauthenticated.into()),
    };

    let memberships = directory.memberships_for(user.id).await?;
    Ok(AuthenticatedCaller::new(&user, memberships))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_tokens_only() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[tokio::test]
    async fn resolves_active_user_with_fresh_memberships() {
        let fixture = Fixture::new();
        let token = fixture.token_for(&fixture.member);
        let caller = resolve_identity(fixture.directory.as_ref(), &fixture.tokens, Some(&token)).await.unwrap();
        assert_eq!(caller.user_id, fixture.member.id);
        assert_eq!(caller.memberships.len(), 1);

        fixture.directory.add_membership(fixture.member.id, fixture.org_b.id, crate::types::OrgRole::Viewer);
        let caller = resolve_identity(fixture.directory.as_ref(), &fixture.tokens, Some(&token)).await.unwrap();
        assert_eq!(caller.memberships.len(), 2);
    }

    #[tokio::test]
    async fn every_credential_failure_is_unauthenticated() {
        let fixture = Fixture::new();
        let directory = fixture.directory.as_ref();

        let missing = resolve_identity(directory, &fixture.tokens, None).await;
        assert!(matches!(missing, Err(ResolveError::Denied(AuthzError::Unauthenticated))));

        let garbage = resolve_identity(directory, &fixture.tokens, Some("garbage")).await;
        assert!(matches!(garbage, Err(ResolveError::Denied(AuthzError::Unauthenticated))));

        let ghost = fixture.tokens.issue(uuid::Uuid::new_v4()).unwrap();
        let unknown = resolve_identity(directory, &fixture.tokens, Some(&ghost)).await;
        assert!(matches!(unknown, Err(ResolveError::Denied(AuthzError::Unauthenticated))));

        fixture.directory.deactivate_user(fixture.member.id);
        let token = fixture.token_for(&fixture.member);
        let inactive = resolve_identity(directory, &fixture.tokens, Some(&token)).await;
        assert!(matches!(inactive, Err(ResolveError::Denied(AuthzError::Unauthenticated))));
    }
}
