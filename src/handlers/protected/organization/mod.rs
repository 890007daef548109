pub mod members;
pub mod projects;
pub mod scope_preview;
pub mod show;
pub mod update_role;

pub use members::members_get;
pub use projects::{project_get, projects_find_post};
pub use scope_preview::scope_preview_post;
pub use show::organization_get;
pub use update_role::member_role_put;
