//! Tenant predicates as values.
//!
//! A [`Predicate`] is built once per request and can be rendered to
//! parameterised SQL or evaluated in memory against a row; both paths share
//! the same structure so they cannot drift apart.

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::entity::EntityScope;
use crate::database::manager::DatabaseManager;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Always,
    OrganizationIs(Uuid),
    OwnerIs(Uuid),
    /// Peer grant for this user, itself scoped to the organization
    PeerGrant { user_id: Uuid, organization_id: Uuid },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

/// The scoped columns of one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub owner_id: Option<Uuid>,
}

/// One row of a peer-grant relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerGrantRow {
    pub table: String,
    pub entity_id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
}

impl Predicate {
    /// Render as SQL over `entity.table`, pushing uuid parameters onto `params`.
    /// Placeholders are numbered by position in `params`.
    pub fn to_sql(&self, entity: &EntityScope, params: &mut Vec<Value>) -> String {
        let table = DatabaseManager::quote_identifier(entity.table);
        match self {
            Predicate::Always => "TRUE".to_string(),
            Predicate::OrganizationIs(organization_id) => format!(
                "{}.{} = {}",
                table,
                DatabaseManager::quote_identifier(entity.organization_column),
                uuid_param(params, *organization_id)
            ),
            Predicate::OwnerIs(user_id) => format!(
                "{}.{} = {}",
                table,
                DatabaseManager::quote_identifier(entity.owner_column),
                uuid_param(params, *user_id)
            ),
            Predicate::PeerGrant { user_id, organization_id } => {
                let Some(peers) = entity.peers else {
                    return "FALSE".to_string();
                };
                format!(
                    "EXISTS (SELECT 1 FROM {} peer WHERE peer.{} = {}.{} AND peer.{} = {} AND peer.{} = {})",
                    DatabaseManager::quote_identifier(peers.table),
                    DatabaseManager::quote_identifier(peers.entity_column),
                    table,
                    DatabaseManager::quote_identifier(entity.id_column),
                    DatabaseManager::quote_identifier(peers.user_column),
                    uuid_param(params, *user_id),
                    DatabaseManager::quote_identifier(peers.organization_column),
                    uuid_param(params, *organization_id),
                )
            }
            Predicate::And(parts) => join(parts, " AND ", "TRUE", entity, params),
            Predicate::Or(parts) => join(parts, " OR ", "FALSE", entity, params),
        }
    }

    /// In-memory evaluation with the same semantics as [`Predicate::to_sql`]
    pub fn admits(&self, entity: &EntityScope, row: &ScopedRow, grants: &[PeerGrantRow]) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::OrganizationIs(organization_id) => row.organization_id == *organization_id,
            Predicate::OwnerIs(user_id) => row.owner_id == Some(*user_id),
            Predicate::PeerGrant { user_id, organization_id } => {
                let Some(peers) = entity.peers else {
                    return false;
                };
                grants.iter().any(|g| {
                    g.table == peers.table
                        && g.entity_id == row.id
                        && g.user_id == *user_id
                        && g.organization_id == *organization_id
                })
            }
            Predicate::And(parts) => parts.iter().all(|p| p.admits(entity, row, grants)),
            Predicate::Or(parts) => parts.iter().any(|p| p.admits(entity, row, grants)),
        }
    }
}

fn uuid_param(params: &mut Vec<Value>, id: Uuid) -> String {
    params.push(Value::String(id.to_string()));
    format!("${}::uuid", params.len())
}

fn join(parts: &[Predicate], joiner: &str, empty: &str, entity: &EntityScope, params: &mut Vec<Value>) -> String {
    if parts.is_empty() {
        return empty.to_string();
    }
    let rendered: Vec<String> = parts.iter().map(|p| format!("({})", p.to_sql(entity, params))).collect();
    rendered.join(joiner)
}
