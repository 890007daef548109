pub mod membership;
pub mod organization;
pub mod project;
pub mod user;

pub use membership::{Member, Membership};
pub use organization::Organization;
pub use project::Project;
pub use user::User;
