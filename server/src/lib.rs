pub mod config;
pub mod connection;
pub mod connection_groups;
pub mod error;
pub mod eviction;
pub mod handlers;
pub mod router;
pub mod server;
pub mod session;
pub mod session_registry;
