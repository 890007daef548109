use thiserror::Error;

/// Migration failures are fatal: the run stops at the first one
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Invariant violated on table '{table}': {condition}")]
    InvariantViolation { table: String, condition: String },

    #[error("Default organization '{0}' does not exist")]
    DefaultOrganizationMissing(String),

    #[error("Table '{0}' does not exist")]
    TableMissing(String),

    #[error("Invalid migration plan: {0}")]
    InvalidPlan(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl MigrationError {
    /// Table the failure is attributed to, when there is one
    pub fn table(&self) -> Option<&str> {
        match self {
            MigrationError::InvariantViolation { table, .. } | MigrationError::TableMissing(table) => Some(table),
            _ => None,
        }
    }
}
