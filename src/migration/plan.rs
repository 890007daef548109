use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::error::MigrationError;
use crate::database::manager::DatabaseManager;

/// Where a table's rows get their organization from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Derivation {
    /// Earliest membership of the user referenced by `owner_column`
    OwnerMembership { owner_column: String },
    /// Parent row's organization, joined through `foreign_key`
    Parent { parent_table: String, foreign_key: String },
    /// No relationship; every row falls back to the default organization
    DefaultOnly,
}

impl fmt::Display for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Derivation::OwnerMembership { owner_column } => write!(f, "owner membership via {}", owner_column),
            Derivation::Parent { parent_table, foreign_key } => write!(f, "parent {} via {}", parent_table, foreign_key),
            Derivation::DefaultOnly => write!(f, "default organization only"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableBackfill {
    pub table: String,
    pub derivation: Derivation,
}

impl TableBackfill {
    pub fn owner(table: &str, owner_column: &str) -> Self {
        Self {
            table: table.to_string(),
            derivation: Derivation::OwnerMembership { owner_column: owner_column.to_string() },
        }
    }

    pub fn parent(table: &str, parent_table: &str, foreign_key: &str) -> Self {
        Self {
            table: table.to_string(),
            derivation: Derivation::Parent { parent_table: parent_table.to_string(), foreign_key: foreign_key.to_string() },
        }
    }

    pub fn default_only(table: &str) -> Self {
        Self { table: table.to_string(), derivation: Derivation::DefaultOnly }
    }

    fn parent_table(&self) -> Option<&str> {
        match &self.derivation {
            Derivation::Parent { parent_table, .. } => Some(parent_table),
            _ => None,
        }
    }
}

/// Tables in foreign-key dependency order: parents always precede children
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationPlan {
    tables: Vec<TableBackfill>,
}

impl MigrationPlan {
    pub fn new(tables: Vec<TableBackfill>) -> Result<Self, MigrationError> {
        let mut names = BTreeSet::new();
        for entry in &tables {
            Self::validate_identifiers(entry)?;
            if !names.insert(entry.table.as_str()) {
                return Err(MigrationError::InvalidPlan(format!("table '{}' listed twice", entry.table)));
            }
        }
        for entry in &tables {
            if let Some(parent) = entry.parent_table() {
                if !names.contains(parent) {
                    return Err(MigrationError::InvalidPlan(format!(
                        "table '{}' derives from unknown parent '{}'",
                        entry.table, parent
                    )));
                }
            }
        }

        // Stable topological sort: keep declaration order among ready tables
        let mut pending = tables;
        let mut placed: BTreeSet<String> = BTreeSet::new();
        let mut ordered = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let ready = pending
                .iter()
                .position(|t| t.parent_table().map_or(true, |p| placed.contains(p)))
                .ok_or_else(|| {
                    let stuck: Vec<&str> = pending.iter().map(|t| t.table.as_str()).collect();
                    MigrationError::InvalidPlan(format!("dependency cycle among: {}", stuck.join(", ")))
                })?;
            let entry = pending.remove(ready);
            placed.insert(entry.table.clone());
            ordered.push(entry);
        }

        Ok(Self { tables: ordered })
    }

    /// Tenant-scoped tables of the application schema
    pub fn standard() -> Result<Self, MigrationError> {
        Self::new(vec![
            TableBackfill::owner("projects", "user_id"),
            TableBackfill::parent("project_members", "projects", "project_id"),
            TableBackfill::parent("tasks", "projects", "project_id"),
            TableBackfill::parent("task_assignees", "tasks", "task_id"),
            TableBackfill::parent("documents", "projects", "project_id"),
            TableBackfill::parent("document_shares", "documents", "document_id"),
            TableBackfill::parent("comments", "tasks", "task_id"),
            TableBackfill::owner("notifications", "user_id"),
        ])
    }

    pub fn tables(&self) -> &[TableBackfill] {
        &self.tables
    }

    /// Stable identity of the plan, used to key checkpoints
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for entry in &self.tables {
            hasher.update(entry.table.as_bytes());
            hasher.update(b"|");
            hasher.update(entry.derivation.to_string().as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }

    fn validate_identifiers(entry: &TableBackfill) -> Result<(), MigrationError> {
        let mut names = vec![entry.table.as_str()];
        match &entry.derivation {
            Derivation::OwnerMembership { owner_column } => names.push(owner_column),
            Derivation::Parent { parent_table, foreign_key } => names.extend([parent_table.as_str(), foreign_key.as_str()]),
            Derivation::DefaultOnly => {}
        }
        match names.into_iter().find(|n| !DatabaseManager::is_valid_identifier(n)) {
            Some(bad) => Err(MigrationError::InvalidPlan(format!("invalid identifier '{}'", bad))),
            None => Ok(()),
        }
    }
}
