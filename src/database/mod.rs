pub mod directory;
pub mod manager;
pub mod models;
pub mod pg_directory;
pub mod repository;
pub mod scoped_query;

pub use directory::{Directory, DirectoryAdmin, MembershipDirectory, RoleChange};
pub use manager::{DatabaseError, DatabaseManager};
pub use pg_directory::PgDirectory;
pub use repository::TenantRepository;
pub use scoped_query::ScopedQuery;
