use axum::http::HeaderMap;
use uuid::Uuid;

use super::identity::ResolveError;
use crate::database::MembershipDirectory;
use crate::policy::{AuthenticatedCaller, AuthzError, OrganizationContext};

pub const ORGANIZATION_QUERY_PARAM: &str = "organization_id";

/// Organization selector from the configured header, else the `organization_id`
/// query parameter. Blank values count as absent.
pub fn organization_selector(headers: &HeaderMap, query: Option<&str>, header_name: &str) -> Option<String> {
    let from_header = headers
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty());

    let from_query = || {
        url::form_urlencoded::parse(query?.as_bytes())
            .find(|(key, _)| key == ORGANIZATION_QUERY_PARAM)
            .map(|(_, value)| value.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    from_header.or_else(from_query)
}

/// Bind the request to one organization.
///
/// Regular callers must select an organization they are a member of; the bound
/// role is the membership in that organization and nowhere else. System
/// administrators may omit the selector (no organization bound) or select any
/// active organization.
pub async fn resolve_organization<D>(
    directory: &D,
    caller: &AuthenticatedCaller,
    selector: Option<&str>,
) -> Result<Option<OrganizationContext>, ResolveError>
where
    D: MembershipDirectory + ?Sized,
{
    if caller.is_super_admin() {
        let Some(selector) = selector else {
            return Ok(None);
        };
        let organization_id = parse_selector(selector)?;
        let organization = directory
            .find_organization(organization_id)
            .await?
            .ok_or(AuthzError::OrganizationMembershipMissing)?;

        return Ok(Some(OrganizationContext {
            organization_id: organization.id,
            role: caller.membership_in(organization.id).map(|m| m.role),
            tier: organization.tier,
        }));
    }

    let selector = selector.ok_or(AuthzError::OrganizationContextMissing)?;
    let organization_id = parse_selector(selector)?;
    let membership = caller
        .membership_in(organization_id)
        .ok_or(AuthzError::OrganizationMembershipMissing)?;

    Ok(Some(OrganizationContext::from_membership(membership)))
}

/// A malformed id cannot name an organization the caller belongs to
fn parse_selector(selector: &str) -> Result<Uuid, AuthzError> {
    Uuid::parse_str(selector).map_err(|_| AuthzError::OrganizationMembershipMissing)
}
