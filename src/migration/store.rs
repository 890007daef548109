use std::collections::BTreeSet;

use async_trait::async_trait;
use uuid::Uuid;

use super::error::MigrationError;

/// Catalog and data operations the backfill needs. Every method acts on the
/// `organization_id` column and must be idempotent.
#[async_trait]
pub trait MigrationStore: Send + Sync {
    async fn table_exists(&self, table: &str) -> Result<bool, MigrationError>;

    async fn column_exists(&self, table: &str) -> Result<bool, MigrationError>;

    async fn add_nullable_column(&self, table: &str) -> Result<(), MigrationError>;

    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Uuid>, MigrationError>;

    /// Copy the parent row's organization into still-null children. Returns rows updated.
    async fn derive_from_parent(&self, table: &str, parent_table: &str, foreign_key: &str) -> Result<u64, MigrationError>;

    /// Use the owner's earliest membership for still-null rows. Returns rows updated.
    async fn derive_from_owner_membership(&self, table: &str, owner_column: &str) -> Result<u64, MigrationError>;

    async fn apply_default(&self, table: &str, organization_id: Uuid) -> Result<u64, MigrationError>;

    async fn count_missing(&self, table: &str) -> Result<u64, MigrationError>;

    async fn column_is_nullable(&self, table: &str) -> Result<bool, MigrationError>;

    async fn set_not_null(&self, table: &str) -> Result<(), MigrationError>;

    async fn foreign_key_exists(&self, table: &str) -> Result<bool, MigrationError>;

    /// FK to `organizations(id) ON DELETE CASCADE` plus a supporting index
    async fn add_foreign_key(&self, table: &str) -> Result<(), MigrationError>;

    async fn ensure_checkpoint_table(&self) -> Result<(), MigrationError>;

    async fn completed_steps(&self, fingerprint: &str) -> Result<BTreeSet<String>, MigrationError>;

    async fn record_step(&self, fingerprint: &str, step: &str) -> Result<(), MigrationError>;
}
