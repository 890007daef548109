pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod migration;
pub mod policy;
pub mod scope;
pub mod server;
pub mod types;

#[cfg(test)]
pub mod testing;
