pub mod entity;
pub mod predicate;
pub mod stamp;
pub mod tenant;

pub use entity::{EntityScope, PeerRelation};
pub use predicate::{PeerGrantRow, Predicate, ScopedRow};
pub use stamp::{stamp_insert, strip_immutable};
pub use tenant::{CrossTenantScope, TenantQueryScope};
