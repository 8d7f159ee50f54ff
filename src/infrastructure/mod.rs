// Infrastructure layer - External dependencies and adapters
pub mod auth;
pub mod backend_client;
pub mod config;
