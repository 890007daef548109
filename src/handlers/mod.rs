// handlers/mod.rs - Handlers grouped by how much the caller must prove
//
// Public (no auth) → Protected (bearer token + policy) → Elevated (system administrators)
pub mod elevated;
pub mod protected;
pub mod public;
