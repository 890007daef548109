//! In-memory collaborators and the shared fixture scenario for unit tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::{password::hash_password, TokenService};
use crate::config::AppConfig;
use crate::database::models::{Member, Membership, Organization, User};
use crate::database::{DatabaseError, DirectoryAdmin, MembershipDirectory, RoleChange};
use crate::migration::{MigrationError, MigrationStore};
use crate::policy::AuthenticatedCaller;
use crate::server::AppState;
use crate::types::{OrgRole, SystemRole, Tier};

pub const PASSWORD: &str = "correct horse battery staple";

#[derive(Debug, Clone)]
struct MembershipRow {
    user_id: Uuid,
    organization_id: Uuid,
    role: OrgRole,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct DirectoryState {
    users: BTreeMap<Uuid, User>,
    organizations: BTreeMap<Uuid, Organization>,
    memberships: Vec<MembershipRow>,
}

/// Directory backed by maps, with the same read-fresh semantics as Postgres
#[derive(Default)]
pub struct MemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl MemoryDirectory {
    pub fn add_user(&self, email: &str, system_role: SystemRole) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            system_role,
            password_hash: hash_password(PASSWORD).unwrap(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.state.write().unwrap().users.insert(user.id, user.clone());
        user
    }

    pub fn add_organization(&self, slug: &str, tier: Tier) -> Organization {
        let organization = Organization {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            tier,
            is_active: true,
            created_at: Utc::now(),
        };
        self.state.write().unwrap().organizations.insert(organization.id, organization.clone());
        organization
    }

    pub fn add_membership(&self, user_id: Uuid, organization_id: Uuid, role: OrgRole) {
        let mut state = self.state.write().unwrap();
        let created_at = Utc::now() + Duration::milliseconds(state.memberships.len() as i64);
        state.memberships.push(MembershipRow { user_id, organization_id, role, created_at });
    }

    pub fn deactivate_user(&self, user_id: Uuid) {
        if let Some(user) = self.state.write().unwrap().users.get_mut(&user_id) {
            user.is_active = false;
        }
    }

    pub fn deactivate_organization(&self, organization_id: Uuid) {
        if let Some(org) = self.state.write().unwrap().organizations.get_mut(&organization_id) {
            org.is_active = false;
        }
    }

    pub fn set_tier(&self, organization_id: Uuid, tier: Tier) {
        if let Some(org) = self.state.write().unwrap().organizations.get_mut(&organization_id) {
            org.tier = tier;
        }
    }

    pub fn role_of(&self, user_id: Uuid, organization_id: Uuid) -> Option<OrgRole> {
        let state = self.state.read().unwrap();
        state
            .memberships
            .iter()
            .find(|m| m.user_id == user_id && m.organization_id == organization_id)
            .map(|m| m.role)
    }
}

#[async_trait]
impl MembershipDirectory for MemoryDirectory {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.state.read().unwrap().users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let state = self.state.read().unwrap();
        Ok(state.users.values().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn memberships_for(&self, user_id: Uuid) -> Result<Vec<Membership>, DatabaseError> {
        let state = self.state.read().unwrap();
        let mut rows: Vec<&MembershipRow> = state.memberships.iter().filter(|m| m.user_id == user_id).collect();
        rows.sort_by_key(|m| m.created_at);
        Ok(rows
            .into_iter()
            .filter_map(|m| {
                let org = state.organizations.get(&m.organization_id).filter(|o| o.is_active)?;
                Some(Membership {
                    organization_id: org.id,
                    organization_slug: org.slug.clone(),
                    role: m.role,
                    tier: org.tier,
                })
            })
            .collect())
    }

    async fn find_organization(&self, organization_id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        let state = self.state.read().unwrap();
        Ok(state.organizations.get(&organization_id).filter(|o| o.is_active).cloned())
    }

    async fn list_members(&self, organization_id: Uuid) -> Result<Vec<Member>, DatabaseError> {
        let state = self.state.read().unwrap();
        Ok(state
            .memberships
            .iter()
            .filter(|m| m.organization_id == organization_id)
            .filter_map(|m| {
                let user = state.users.get(&m.user_id)?;
                Some(Member {
                    user_id: user.id,
                    email: user.email.clone(),
                    name: user.name.clone(),
                    role: m.role,
                    joined_at: m.created_at,
                })
            })
            .collect())
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, DatabaseError> {
        Ok(self.state.read().unwrap().organizations.values().cloned().collect())
    }
}

#[async_trait]
impl DirectoryAdmin for MemoryDirectory {
    async fn set_member_role(&self, organization_id: Uuid, user_id: Uuid, role: OrgRole) -> Result<RoleChange, DatabaseError> {
        let mut state = self.state.write().unwrap();
        let owners = state
            .memberships
            .iter()
            .filter(|m| m.organization_id == organization_id && m.role == OrgRole::Owner)
            .count();
        let Some(row) = state
            .memberships
            .iter_mut()
            .find(|m| m.user_id == user_id && m.organization_id == organization_id)
        else {
            return Ok(RoleChange::NotMember);
        };
        if row.role == OrgRole::Owner && role != OrgRole::Owner && owners <= 1 {
            return Ok(RoleChange::LastOwner);
        }
        let previous = row.role;
        row.role = role;
        Ok(RoleChange::Updated { previous })
    }

    async fn set_organization_tier(&self, organization_id: Uuid, tier: Tier) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().unwrap();
        match state.organizations.get_mut(&organization_id) {
            Some(org) => {
                org.tier = tier;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Scenario shared by resolver, guard and router tests:
/// `member` is a member of `org_a` (basic) with no membership in `org_b` (professional),
/// `owner` owns `org_a`, `admin` is a system administrator with no memberships.
pub struct Fixture {
    pub directory: Arc<MemoryDirectory>,
    pub tokens: TokenService,
    pub org_a: Organization,
    pub org_b: Organization,
    pub member: User,
    pub owner: User,
    pub admin: User,
}

impl Fixture {
    pub fn new() -> Self {
        let directory = Arc::new(MemoryDirectory::default());
        let org_a = directory.add_organization("acme", Tier::Basic);
        let org_b = directory.add_organization("globex", Tier::Professional);
        let member = directory.add_user("u@acme.test", SystemRole::Member);
        let owner = directory.add_user("owner@acme.test", SystemRole::Member);
        let admin = directory.add_user("root@ops.test", SystemRole::SuperAdmin);
        directory.add_membership(owner.id, org_a.id, OrgRole::Owner);
        directory.add_membership(member.id, org_a.id, OrgRole::Member);

        Self {
            directory,
            tokens: TokenService::new("test-secret", 1),
            org_a,
            org_b,
            member,
            owner,
            admin,
        }
    }

    pub fn token_for(&self, user: &User) -> String {
        self.tokens.issue(user.id).unwrap()
    }

    pub async fn caller(&self, user: &User) -> AuthenticatedCaller {
        let memberships = self.directory.memberships_for(user.id).await.unwrap();
        AuthenticatedCaller::new(user, memberships)
    }

    pub fn state(&self) -> AppState {
        let mut config = AppConfig::from_env();
        config.security.organization_header = "x-organization-id".to_string();
        config.security.enable_audit_logging = true;
        let mut state = AppState::new(self.directory.clone(), &config);
        state.tokens = self.tokens.clone();
        state
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemTable {
    pub has_column: bool,
    pub nullable: bool,
    pub foreign_key: bool,
    /// Updates silently affect no rows, as with a blocking trigger
    pub reject_updates: bool,
    pub rows: Vec<MemRow>,
}

#[derive(Debug, Clone, Default)]
pub struct MemRow {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub refs: BTreeMap<String, Uuid>,
}

impl MemRow {
    pub fn new(id: Uuid) -> Self {
        Self { id, ..Default::default() }
    }

    pub fn with_ref(mut self, column: &str, value: Uuid) -> Self {
        self.refs.insert(column.to_string(), value);
        self
    }
}

#[derive(Default)]
struct StoreState {
    tables: BTreeMap<String, MemTable>,
    organizations: BTreeMap<String, Uuid>,
    /// (user, organization) in creation order
    memberships: Vec<(Uuid, Uuid)>,
    checkpoints: BTreeMap<String, BTreeSet<String>>,
    checkpoint_table: bool,
}

/// Migration store over in-memory tables
#[derive(Default)]
pub struct MemoryMigrationStore {
    state: Mutex<StoreState>,
}

impl MemoryMigrationStore {
    pub async fn add_table(&self, name: &str, rows: Vec<MemRow>) {
        let table = MemTable { rows, ..Default::default() };
        self.state.lock().await.tables.insert(name.to_string(), table);
    }

    pub async fn add_organization(&self, slug: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.organizations.insert(slug.to_string(), id);
        id
    }

    pub async fn add_membership(&self, user_id: Uuid, organization_id: Uuid) {
        self.state.lock().await.memberships.push((user_id, organization_id));
    }

    pub async fn reject_updates(&self, table: &str) {
        if let Some(t) = self.state.lock().await.tables.get_mut(table) {
            t.reject_updates = true;
        }
    }

    pub async fn allow_updates(&self, table: &str) {
        if let Some(t) = self.state.lock().await.tables.get_mut(table) {
            t.reject_updates = false;
        }
    }

    pub async fn table(&self, name: &str) -> MemTable {
        self.state.lock().await.tables.get(name).cloned().unwrap_or_default()
    }

    pub async fn organization_of(&self, table: &str, id: Uuid) -> Option<Uuid> {
        let state = self.state.lock().await;
        state.tables.get(table)?.rows.iter().find(|r| r.id == id)?.organization_id
    }
}

fn missing(table: &str) -> MigrationError {
    MigrationError::TableMissing(table.to_string())
}

#[async_trait]
impl MigrationStore for MemoryMigrationStore {
    async fn table_exists(&self, table: &str) -> Result<bool, MigrationError> {
        Ok(self.state.lock().await.tables.contains_key(table))
    }

    async fn column_exists(&self, table: &str) -> Result<bool, MigrationError> {
        Ok(self.state.lock().await.tables.get(table).map_or(false, |t| t.has_column))
    }

    async fn add_nullable_column(&self, table: &str) -> Result<(), MigrationError> {
        let mut state = self.state.lock().await;
        let t = state.tables.get_mut(table).ok_or_else(|| missing(table))?;
        if !t.has_column {
            t.has_column = true;
            t.nullable = true;
        }
        Ok(())
    }

    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Uuid>, MigrationError> {
        Ok(self.state.lock().await.organizations.get(slug).copied())
    }

    async fn derive_from_parent(&self, table: &str, parent_table: &str, foreign_key: &str) -> Result<u64, MigrationError> {
        let mut state = self.state.lock().await;
        let parents: BTreeMap<Uuid, Option<Uuid>> = state
            .tables
            .get(parent_table)
            .ok_or_else(|| missing(parent_table))?
            .rows
            .iter()
            .map(|r| (r.id, r.organization_id))
            .collect();

        let t = state.tables.get_mut(table).ok_or_else(|| missing(table))?;
        if t.reject_updates {
            return Ok(0);
        }
        let mut updated = 0;
        for row in t.rows.iter_mut().filter(|r| r.organization_id.is_none()) {
            let parent_org = row.refs.get(foreign_key).and_then(|p| parents.get(p).copied().flatten());
            if let Some(org) = parent_org {
                row.organization_id = Some(org);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn derive_from_owner_membership(&self, table: &str, owner_column: &str) -> Result<u64, MigrationError> {
        let mut state = self.state.lock().await;
        let memberships = state.memberships.clone();
        let t = state.tables.get_mut(table).ok_or_else(|| missing(table))?;
        if t.reject_updates {
            return Ok(0);
        }
        let mut updated = 0;
        for row in t.rows.iter_mut().filter(|r| r.organization_id.is_none()) {
            let Some(owner) = row.refs.get(owner_column) else { continue };
            if let Some((_, org)) = memberships.iter().find(|(user, _)| user == owner) {
                row.organization_id = Some(*org);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn apply_default(&self, table: &str, organization_id: Uuid) -> Result<u64, MigrationError> {
        let mut state = self.state.lock().await;
        let t = state.tables.get_mut(table).ok_or_else(|| missing(table))?;
        if t.reject_updates {
            return Ok(0);
        }
        let mut updated = 0;
        for row in t.rows.iter_mut().filter(|r| r.organization_id.is_none()) {
            row.organization_id = Some(organization_id);
            updated += 1;
        }
        Ok(updated)
    }

    async fn count_missing(&self, table: &str) -> Result<u64, MigrationError> {
        let state = self.state.lock().await;
        let t = state.tables.get(table).ok_or_else(|| missing(table))?;
        Ok(t.rows.iter().filter(|r| r.organization_id.is_none()).count() as u64)
    }

    async fn column_is_nullable(&self, table: &str) -> Result<bool, MigrationError> {
        Ok(self.state.lock().await.tables.get(table).map_or(false, |t| t.nullable))
    }

    async fn set_not_null(&self, table: &str) -> Result<(), MigrationError> {
        let mut state = self.state.lock().await;
        let t = state.tables.get_mut(table).ok_or_else(|| missing(table))?;
        if t.rows.iter().any(|r| r.organization_id.is_none()) {
            return Err(MigrationError::InvariantViolation {
                table: table.to_string(),
                condition: "column contains null values".to_string(),
            });
        }
        t.nullable = false;
        Ok(())
    }

    async fn foreign_key_exists(&self, table: &str) -> Result<bool, MigrationError> {
        Ok(self.state.lock().await.tables.get(table).map_or(false, |t| t.foreign_key))
    }

    async fn add_foreign_key(&self, table: &str) -> Result<(), MigrationError> {
        let mut state = self.state.lock().await;
        let t = state.tables.get_mut(table).ok_or_else(|| missing(table))?;
        t.foreign_key = true;
        Ok(())
    }

    async fn ensure_checkpoint_table(&self) -> Result<(), MigrationError> {
        self.state.lock().await.checkpoint_table = true;
        Ok(())
    }

    async fn completed_steps(&self, fingerprint: &str) -> Result<BTreeSet<String>, MigrationError> {
        Ok(self.state.lock().await.checkpoints.get(fingerprint).cloned().unwrap_or_default())
    }

    async fn record_step(&self, fingerprint: &str, step: &str) -> Result<(), MigrationError> {
        let mut state = self.state.lock().await;
        state.checkpoints.entry(fingerprint.to_string()).or_default().insert(step.to_string());
        Ok(())
    }
}
