pub mod authorize;
pub mod identity;
pub mod organization;
pub mod response;

pub use authorize::{authorize, authorize_request, Guarded};
pub use identity::{bearer_token, resolve_identity, ResolveError};
pub use organization::{organization_selector, resolve_organization};
pub use response::{ApiResponse, ApiResult};
