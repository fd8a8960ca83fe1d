/// Database configuration and connection management
pub mod database;

/// Item catalog seed loading from config.toml
pub mod catalog;

/// Server settings from environment variables
pub mod server;
