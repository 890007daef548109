pub mod context;
pub mod error;
pub mod guard;
pub mod registry;
pub mod requirement;

pub use context::{AuthenticatedCaller, OrganizationContext, RequestContext};
pub use error::AuthzError;
pub use registry::{operations, PolicyRegistry};
pub use requirement::{OperationScope, PolicyRequirement};
