// handlers/elevated/mod.rs - System administrator handlers
//
// Registered as admin-only operations: the guard rejects anyone without the
// super_admin system role before these run.
pub mod organizations;
