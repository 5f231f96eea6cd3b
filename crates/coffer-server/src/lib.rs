//! # Coffer Server
//!
//! HTTP API server exposing a directory as a file resource and a small
//! JSON-backed item store.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, Server, ServerConfig, ServerConfigBuilder};
