//! Storage configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::FileName;

/// Default name of the item mapping document.
pub const DEFAULT_ITEMS_FILE: &str = "items.json";

/// What the item store does when the mapping document cannot be read or parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptItemPolicy {
    /// Log a warning and behave as if the mapping were empty.
    #[default]
    TreatAsEmpty,
    /// Fail the request with [`Error::CorruptItemStore`] or
    /// [`Error::UnreadableItemStore`].
    Reject,
}

/// Where and how files and items are stored.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory files are read from and written to.
    pub root: PathBuf,
    /// Name of the item mapping document inside `root`.
    pub items_file: FileName,
    /// Corrupt mapping handling.
    pub corrupt_items: CorruptItemPolicy,
    /// Maximum accepted upload size in bytes (`None` = unlimited).
    pub max_upload_bytes: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            items_file: FileName(DEFAULT_ITEMS_FILE.to_string()),
            corrupt_items: CorruptItemPolicy::default(),
            max_upload_bytes: None,
        }
    }
}

impl StoreConfig {
    /// Creates a new store config builder.
    #[must_use]
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Returns the full path of the item mapping document.
    #[must_use]
    pub fn items_path(&self) -> PathBuf {
        self.root.join(self.items_file.as_str())
    }
}

/// Builder for [`StoreConfig`].
#[derive(Debug, Default)]
pub struct StoreConfigBuilder {
    root: Option<PathBuf>,
    items_file: Option<String>,
    corrupt_items: Option<CorruptItemPolicy>,
    max_upload_bytes: Option<u64>,
}

impl StoreConfigBuilder {
    /// Sets the storage root.
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Sets the item mapping file name.
    #[must_use]
    pub fn items_file(mut self, name: impl Into<String>) -> Self {
        self.items_file = Some(name.into());
        self
    }

    /// Sets the corrupt mapping policy.
    #[must_use]
    pub fn corrupt_items(mut self, policy: CorruptItemPolicy) -> Self {
        self.corrupt_items = Some(policy);
        self
    }

    /// Sets the upload size limit.
    #[must_use]
    pub fn max_upload_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    /// Builds the store config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the items file name is not a
    /// plain file name or the upload limit is zero.
    pub fn build(self) -> Result<StoreConfig> {
        let items_file = match self.items_file {
            Some(name) => FileName::new(name)
                .map_err(|e| Error::invalid_config(format!("items_file: {e}")))?,
            None => FileName(DEFAULT_ITEMS_FILE.to_string()),
        };

        if self.max_upload_bytes == Some(0) {
            return Err(Error::invalid_config("max_upload_bytes must be positive"));
        }

        Ok(StoreConfig {
            root: self.root.unwrap_or_else(|| PathBuf::from(".")),
            items_file,
            corrupt_items: self.corrupt_items.unwrap_or_default(),
            max_upload_bytes: self.max_upload_bytes,
        })
    }
}
