pub mod error;
pub mod migrator;
pub mod pg_store;
pub mod plan;
pub mod store;

pub use error::MigrationError;
pub use migrator::{MigrationReport, TableReport, TenantBackfillMigrator};
pub use pg_store::PgMigrationStore;
pub use plan::{Derivation, MigrationPlan, TableBackfill};
pub use store::MigrationStore;
