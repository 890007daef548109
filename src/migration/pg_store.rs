use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::error::MigrationError;
use super::store::MigrationStore;
use crate::database::manager::DatabaseManager;
use crate::scope::stamp::ORGANIZATION_COLUMN;

const CHECKPOINT_TABLE: &str = "tenant_backfill_checkpoints";

pub struct PgMigrationStore {
    pool: PgPool,
}

impl PgMigrationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn quote(name: &str) -> String {
    DatabaseManager::quote_identifier(name)
}

#[async_trait]
impl MigrationStore for PgMigrationStore {
    async fn table_exists(&self, table: &str) -> Result<bool, MigrationError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = $1)",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn column_exists(&self, table: &str) -> Result<bool, MigrationError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.columns
                WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2
            )
            "#,
        )
        .bind(table)
        .bind(ORGANIZATION_COLUMN)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn add_nullable_column(&self, table: &str) -> Result<(), MigrationError> {
        let ddl = format!("ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} UUID", quote(table), quote(ORGANIZATION_COLUMN));
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Uuid>, MigrationError> {
        let id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM organizations WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn derive_from_parent(&self, table: &str, parent_table: &str, foreign_key: &str) -> Result<u64, MigrationError> {
        let org = quote(ORGANIZATION_COLUMN);
        let sql = format!(
            "UPDATE {table} AS child SET {org} = parent.{org} FROM {parent} AS parent \
             WHERE child.{fk} = parent.\"id\" AND child.{org} IS NULL AND parent.{org} IS NOT NULL",
            table = quote(table),
            parent = quote(parent_table),
            fk = quote(foreign_key),
            org = org,
        );
        let result = sqlx::query(&sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn derive_from_owner_membership(&self, table: &str, owner_column: &str) -> Result<u64, MigrationError> {
        let org = quote(ORGANIZATION_COLUMN);
        let owner = quote(owner_column);
        let sql = format!(
            "UPDATE {table} AS target SET {org} = ( \
                 SELECT m.organization_id FROM memberships m WHERE m.user_id = target.{owner} \
                 ORDER BY m.created_at ASC, m.organization_id ASC LIMIT 1) \
             WHERE target.{org} IS NULL \
             AND EXISTS (SELECT 1 FROM memberships m WHERE m.user_id = target.{owner})",
            table = quote(table),
            org = org,
            owner = owner,
        );
        let result = sqlx::query(&sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn apply_default(&self, table: &str, organization_id: Uuid) -> Result<u64, MigrationError> {
        let org = quote(ORGANIZATION_COLUMN);
        let sql = format!("UPDATE {} SET {org} = $1 WHERE {org} IS NULL", quote(table), org = org);
        let result = sqlx::query(&sql).bind(organization_id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn count_missing(&self, table: &str) -> Result<u64, MigrationError> {
        let sql = format!("SELECT COUNT(*) AS count FROM {} WHERE {} IS NULL", quote(table), quote(ORGANIZATION_COLUMN));
        let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn column_is_nullable(&self, table: &str) -> Result<bool, MigrationError> {
        let nullable: Option<String> = sqlx::query_scalar(
            r#"
            SELECT is_nullable FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2
            "#,
        )
        .bind(table)
        .bind(ORGANIZATION_COLUMN)
        .fetch_optional(&self.pool)
        .await?;
        Ok(nullable.as_deref() == Some("YES"))
    }

    async fn set_not_null(&self, table: &str) -> Result<(), MigrationError> {
        let ddl = format!("ALTER TABLE {} ALTER COLUMN {} SET NOT NULL", quote(table), quote(ORGANIZATION_COLUMN));
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    async fn foreign_key_exists(&self, table: &str) -> Result<bool, MigrationError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM information_schema.table_constraints tc
                JOIN information_schema.key_column_usage kcu
                  ON tc.constraint_name = kcu.constraint_name
                 AND tc.table_schema = kcu.table_schema
                WHERE tc.constraint_type = 'FOREIGN KEY'
                  AND tc.table_schema = current_schema()
                  AND tc.table_name = $1
                  AND kcu.column_name = $2
            )
            "#,
        )
        .bind(table)
        .bind(ORGANIZATION_COLUMN)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn add_foreign_key(&self, table: &str) -> Result<(), MigrationError> {
        let index = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quote(&format!("idx_{}_{}", table, ORGANIZATION_COLUMN)),
            quote(table),
            quote(ORGANIZATION_COLUMN)
        );
        sqlx::query(&index).execute(&self.pool).await?;

        let constraint = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES organizations(id) ON DELETE CASCADE",
            quote(table),
            quote(&format!("fk_{}_{}", table, ORGANIZATION_COLUMN)),
            quote(ORGANIZATION_COLUMN)
        );
        sqlx::query(&constraint).execute(&self.pool).await?;
        Ok(())
    }

    async fn ensure_checkpoint_table(&self) -> Result<(), MigrationError> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} ( \
                 plan_fingerprint TEXT NOT NULL, \
                 step TEXT NOT NULL, \
                 completed_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
                 PRIMARY KEY (plan_fingerprint, step))",
            CHECKPOINT_TABLE
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    async fn completed_steps(&self, fingerprint: &str) -> Result<BTreeSet<String>, MigrationError> {
        let sql = format!("SELECT step FROM {} WHERE plan_fingerprint = $1", CHECKPOINT_TABLE);
        let steps: Vec<String> = sqlx::query_scalar(&sql).bind(fingerprint).fetch_all(&self.pool).await?;
        Ok(steps.into_iter().collect())
    }

    async fn record_step(&self, fingerprint: &str, step: &str) -> Result<(), MigrationError> {
        let sql = format!(
            "INSERT INTO {} (plan_fingerprint, step) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            CHECKPOINT_TABLE
        );
        sqlx::query(&sql).bind(fingerprint).bind(step).execute(&self.pool).await?;
        Ok(())
    }
}
