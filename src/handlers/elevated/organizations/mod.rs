pub mod list;
pub mod update_tier;

pub use list::organizations_get;
pub use update_tier::organization_tier_put;
