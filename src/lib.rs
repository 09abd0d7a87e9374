pub mod api_response;
pub mod auth;
pub mod cache;
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod health;
pub mod metrics;
pub mod provider;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod utils;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;
pub use server::Server;
