// handlers/protected/mod.rs - Handlers behind the authorize middleware
//
// Every route here is registered with an operation id. The middleware has
// already resolved the caller and organization and run the guards, so
// handlers read `Extension<RequestContext>` and never re-check policy.
pub mod auth;
pub mod organization;
