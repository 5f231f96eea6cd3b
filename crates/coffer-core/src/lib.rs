//! # Coffer Core
//!
//! Core types and storage for the Coffer file resource service.
//!
//! This crate provides the pieces shared by the server and the CLI:
//! - The error taxonomy
//! - Validated file names and item records
//! - The filesystem-backed file store and JSON item store

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod file_store;
pub mod item_store;
pub mod types;

pub use config::{CorruptItemPolicy, StoreConfig, DEFAULT_ITEMS_FILE};
pub use error::{Error, Result};
pub use file_store::{FileStore, OpenedFile};
pub use item_store::{ItemMap, ItemSnapshot, ItemStore, LoadOutcome};
pub use types::*;
