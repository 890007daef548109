// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition and liveness only. Nothing here sees a RequestContext.
pub mod auth;
pub mod health;

pub use auth::login_post;
pub use health::health_get;
