// Public API for integration tests and the server binary

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod handlers;
pub mod protocol;
pub mod state;
pub mod store;
pub mod transport;
pub mod types;
