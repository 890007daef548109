use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::directory::{DirectoryAdmin, MembershipDirectory, RoleChange};
use super::manager::DatabaseError;
use super::models::{Member, Membership, Organization, User};
use crate::types::{OrgRole, Tier};

/// Postgres-backed directory over `users`, `organizations` and `memberships`
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Parse a text column into one of the string-backed enums
fn parse_column<T: FromStr>(row: &PgRow, column: &'static str) -> Result<T, DatabaseError> {
    let raw: String = row.try_get(column)?;
    T::from_str(&raw).map_err(|_| DatabaseError::Decode { column, value: raw })
}

fn user_from_row(row: &PgRow) -> Result<User, DatabaseError> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        system_role: parse_column(row, "system_role")?,
        password_hash: row.try_get("password_hash")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn organization_from_row(row: &PgRow) -> Result<Organization, DatabaseError> {
    Ok(Organization {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        tier: parse_column(row, "tier")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

const USER_COLUMNS: &str = "id, email, name, system_role, password_hash, is_active, created_at";

#[async_trait]
impl MembershipDirectory for PgDirectory {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql).bind(user_id).fetch_optional(&self.pool).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE lower(email) = lower($1)", USER_COLUMNS);
        let row = sqlx::query(&sql).bind(email).fetch_optional(&self.pool).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn memberships_for(&self, user_id: Uuid) -> Result<Vec<Membership>, DatabaseError> {
        let rows = sqlx::query(
            r#"
            SELECT m.organization_id, o.slug, m.role, o.tier
            FROM memberships m
            JOIN organizations o ON o.id = m.organization_id
            WHERE m.user_id = $1
            AND o.is_active = true
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Membership {
                    organization_id: row.try_get("organization_id")?,
                    organization_slug: row.try_get("slug")?,
                    role: parse_column(row, "role")?,
                    tier: parse_column(row, "tier")?,
                })
            })
            .collect()
    }

    async fn find_organization(&self, organization_id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        let row = sqlx::query(
            "SELECT id, slug, name, tier, is_active, created_at FROM organizations WHERE id = $1 AND is_active = true",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(organization_from_row).transpose()
    }

    async fn list_members(&self, organization_id: Uuid) -> Result<Vec<Member>, DatabaseError> {
        let rows = sqlx::query(
            r#"
            SELECT u.id AS user_id, u.email, u.name, m.role, m.created_at AS joined_at
            FROM memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.organization_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Member {
                    user_id: row.try_get("user_id")?,
                    email: row.try_get("email")?,
                    name: row.try_get("name")?,
                    role: parse_column(row, "role")?,
                    joined_at: row.try_get("joined_at")?,
                })
            })
            .collect()
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, DatabaseError> {
        let rows = sqlx::query("SELECT id, slug, name, tier, is_active, created_at FROM organizations ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(organization_from_row).collect()
    }
}

#[async_trait]
impl DirectoryAdmin for PgDirectory {
    async fn set_member_role(&self, organization_id: Uuid, user_id: Uuid, role: OrgRole) -> Result<RoleChange, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        // Serializes role changes within one organization so concurrent demotions
        // cannot both pass the owner count below
        sqlx::query("SELECT id FROM organizations WHERE id = $1 FOR UPDATE")
            .bind(organization_id)
            .fetch_optional(&mut *tx)
            .await?;

        let current = sqlx::query("SELECT role FROM memberships WHERE organization_id = $1 AND user_id = $2")
            .bind(organization_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(current) = current else {
            return Ok(RoleChange::NotMember);
        };
        let previous: OrgRole = parse_column(&current, "role")?;

        if previous == OrgRole::Owner && role != OrgRole::Owner {
            let owners: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM memberships WHERE organization_id = $1 AND role = 'owner'")
                    .bind(organization_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if owners <= 1 {
                return Ok(RoleChange::LastOwner);
            }
        }

        sqlx::query("UPDATE memberships SET role = $1 WHERE organization_id = $2 AND user_id = $3")
            .bind(role.to_string())
            .bind(organization_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(RoleChange::Updated { previous })
    }

    async fn set_organization_tier(&self, organization_id: Uuid, tier: Tier) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE organizations SET tier = $1, updated_at = now() WHERE id = $2")
            .bind(tier.to_string())
            .bind(organization_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
