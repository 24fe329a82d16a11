//! # HTTP adapter
//!
//! Plays the host proxy over plain HTTP: every request goes through the
//! gateway's query channel and, when upgraded, its update channel.
//!
//! # Endpoints
//!
//! - `/health` - Liveness, document count and counters
//! - everything else - Forwarded to [`crate::protocol::Gateway::handle`]

pub mod config;
mod routes;
pub mod server;

pub use config::HttpServerConfig;
pub use routes::gateway_routes;
pub use server::HttpServer;
