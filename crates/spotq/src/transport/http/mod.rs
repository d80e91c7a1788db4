//! HTTP transport: axum routes and server.

mod routes;
mod server;

pub use routes::{CommandRequest, CommandResponse, HealthCheckResponse, routes};
pub use server::{ServerConfig, serve};
