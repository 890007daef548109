pub mod backfill;
pub mod policy;
pub mod token;
