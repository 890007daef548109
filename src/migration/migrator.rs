use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::MigrationError;
use super::plan::{Derivation, MigrationPlan, TableBackfill};
use super::store::MigrationStore;

pub const DOWN_MESSAGE: &str = "Tenant backfill is not reversible: organization_id columns, constraints and \
derived values are left in place. Drop them manually if a rollback is really required.";

/// What one table went through during a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: String,
    pub derived: u64,
    pub defaulted: u64,
    pub made_not_null: bool,
    pub foreign_key_added: bool,
    pub skipped_steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub plan_fingerprint: String,
    pub columns_added: Vec<String>,
    pub default_organization: Uuid,
    pub tables: Vec<TableReport>,
}

impl MigrationReport {
    pub fn changed_anything(&self) -> bool {
        !self.columns_added.is_empty()
            || self
                .tables
                .iter()
                .any(|t| t.derived > 0 || t.defaulted > 0 || t.made_not_null || t.foreign_key_added)
    }
}

pub fn step_key(step: &str, table: Option<&str>) -> String {
    match table {
        Some(table) => format!("{}:{}", step, table),
        None => step.to_string(),
    }
}

/// Introduces a mandatory `organization_id` on every planned table.
///
/// Phases run in order: add nullable columns, resolve the default organization,
/// then derive / verify / enforce per table in dependency order. The first
/// failure aborts the run; completed steps stay checkpointed.
pub struct TenantBackfillMigrator<S> {
    store: S,
    plan: MigrationPlan,
    default_slug: String,
    use_checkpoints: bool,
}

struct Checkpoints<'a, S> {
    store: &'a S,
    fingerprint: String,
    completed: BTreeSet<String>,
    enabled: bool,
}

impl<'a, S: MigrationStore> Checkpoints<'a, S> {
    fn is_done(&self, key: &str) -> bool {
        self.enabled && self.completed.contains(key)
    }

    async fn mark(&mut self, key: String) -> Result<(), MigrationError> {
        if self.enabled {
            self.store.record_step(&self.fingerprint, &key).await?;
            self.completed.insert(key);
        }
        Ok(())
    }
}

impl<S: MigrationStore> TenantBackfillMigrator<S> {
    pub fn new(store: S, plan: MigrationPlan, default_slug: impl Into<String>) -> Self {
        Self { store, plan, default_slug: default_slug.into(), use_checkpoints: true }
    }

    pub fn with_checkpoints(mut self, enabled: bool) -> Self {
        self.use_checkpoints = enabled;
        self
    }

    pub fn plan(&self) -> &MigrationPlan {
        &self.plan
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn run(&self) -> Result<MigrationReport, MigrationError> {
        let fingerprint = self.plan.fingerprint();
        let completed = if self.use_checkpoints {
            self.store.ensure_checkpoint_table().await?;
            self.store.completed_steps(&fingerprint).await?
        } else {
            BTreeSet::new()
        };
        let mut checkpoints = Checkpoints {
            store: &self.store,
            fingerprint: fingerprint.clone(),
            completed,
            enabled: self.use_checkpoints,
        };

        let mut reports: Vec<TableReport> = self
            .plan
            .tables()
            .iter()
            .map(|t| TableReport { table: t.table.clone(), ..Default::default() })
            .collect();

        info!("Phase 1: adding nullable organization_id to {} tables", reports.len());
        let mut columns_added = vec![];
        for (entry, report) in self.plan.tables().iter().zip(reports.iter_mut()) {
            let key = step_key("add_column", Some(&entry.table));
            if checkpoints.is_done(&key) {
                report.skipped_steps.push(key);
                continue;
            }
            if !self.store.table_exists(&entry.table).await? {
                return Err(MigrationError::TableMissing(entry.table.clone()));
            }
            if !self.store.column_exists(&entry.table).await? {
                self.store.add_nullable_column(&entry.table).await?;
                info!("Added organization_id to '{}'", entry.table);
                columns_added.push(entry.table.clone());
            }
            checkpoints.mark(key).await?;
        }

        // Always resolved, even when checkpointed: later phases need the id
        info!("Phase 2: resolving default organization '{}'", self.default_slug);
        let default_organization = self
            .store
            .find_organization_by_slug(&self.default_slug)
            .await?
            .ok_or_else(|| MigrationError::DefaultOrganizationMissing(self.default_slug.clone()))?;
        let seed_key = step_key("seed_default", None);
        if !checkpoints.is_done(&seed_key) {
            checkpoints.mark(seed_key).await?;
        }

        info!("Phase 3-5: derive, verify and enforce per table");
        for (entry, report) in self.plan.tables().iter().zip(reports.iter_mut()) {
            self.backfill_table(entry, default_organization, report, &mut checkpoints).await?;
        }

        let report = MigrationReport {
            plan_fingerprint: fingerprint,
            columns_added,
            default_organization,
            tables: reports,
        };
        if report.changed_anything() {
            info!("Tenant backfill complete");
        } else {
            info!("Tenant backfill complete, nothing to change");
        }
        Ok(report)
    }

    async fn backfill_table(
        &self,
        entry: &TableBackfill,
        default_organization: Uuid,
        report: &mut TableReport,
        checkpoints: &mut Checkpoints<'_, S>,
    ) -> Result<(), MigrationError> {
        let table = entry.table.as_str();

        // Derivation is only checkpointed once verification passes, so a run that
        // aborts here derives again after remediation
        let derive_key = step_key("derive", Some(table));
        let derive_done = checkpoints.is_done(&derive_key);
        if derive_done {
            report.skipped_steps.push(derive_key.clone());
        } else {
            report.derived = match &entry.derivation {
                Derivation::Parent { parent_table, foreign_key } => {
                    self.store.derive_from_parent(table, parent_table, foreign_key).await?
                }
                Derivation::OwnerMembership { owner_column } => {
                    self.store.derive_from_owner_membership(table, owner_column).await?
                }
                Derivation::DefaultOnly => 0,
            };
            report.defaulted = self.store.apply_default(table, default_organization).await?;
            if report.defaulted > 0 {
                warn!("{} rows of '{}' fell back to the default organization", report.defaulted, table);
            }
        }

        // Verification is never skipped
        let missing = self.store.count_missing(table).await?;
        if missing > 0 {
            return Err(MigrationError::InvariantViolation {
                table: table.to_string(),
                condition: format!("{} rows still have a NULL organization_id", missing),
            });
        }
        if !derive_done {
            checkpoints.mark(derive_key).await?;
        }
        let verify_key = step_key("verify", Some(table));
        if !checkpoints.is_done(&verify_key) {
            checkpoints.mark(verify_key).await?;
        }

        let enforce_key = step_key("enforce", Some(table));
        if checkpoints.is_done(&enforce_key) {
            report.skipped_steps.push(enforce_key);
            return Ok(());
        }
        if self.store.column_is_nullable(table).await? {
            self.store.set_not_null(table).await?;
            report.made_not_null = true;
        }
        if !self.store.foreign_key_exists(table).await? {
            self.store.add_foreign_key(table).await?;
            report.foreign_key_added = true;
        }
        checkpoints.mark(enforce_key).await?;
        info!("Backfilled '{}': derived={} defaulted={}", table, report.derived, report.defaulted);
        Ok(())
    }

    /// Reports that nothing is reversed; the schema is left untouched
    pub fn down(&self) -> &'static str {
        warn!("Tenant backfill down requested; nothing will be changed");
        DOWN_MESSAGE
    }
}
