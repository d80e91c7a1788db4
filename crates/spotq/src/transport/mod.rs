//! Transport layer for spotq.
//!
//! Currently provides HTTP transport via axum. Chat platforms that push events
//! over HTTP (slash commands, outgoing webhooks) post to `/commands`.

pub mod http;

pub use http::{ServerConfig, serve};
