//! JSON-backed item mapping.
//!
//! The whole mapping lives in one document keyed by string-encoded ids. Every
//! write loads the document, changes one entry and replaces the file. Writes
//! go to a temporary sibling that is renamed over the original, and the
//! read-modify-write cycle is serialised inside the process, so readers never
//! see a half-written document and concurrent puts do not lose each other.
//!
//! Temporary siblings are named `.<items file>.<uuid>.tmp`. They live in the
//! storage root next to uploaded files, so [`crate::FileStore::list`] skips
//! them. Nothing stops a client from deleting one mid-write; the put then
//! fails and the previous document stays in place.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::{CorruptItemPolicy, StoreConfig};
use crate::error::{Error, Result};
use crate::types::{Item, ItemId};

/// The full id → record mapping.
pub type ItemMap = BTreeMap<ItemId, Item>;

/// How the mapping document was found on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The document existed and parsed.
    Loaded,
    /// No document exists yet.
    Missing,
    /// The document exists but is not a valid mapping.
    Corrupt {
        /// Parser message.
        reason: String,
    },
    /// Something exists at the document path but could not be read.
    Unreadable {
        /// I/O error message.
        reason: String,
    },
}

/// Result of reading the mapping document.
#[derive(Debug, Clone)]
pub struct ItemSnapshot {
    /// Parsed records; empty unless `outcome` is [`LoadOutcome::Loaded`].
    pub items: ItemMap,
    /// What was found on disk.
    pub outcome: LoadOutcome,
}

/// Item mapping persisted as a single JSON document.
#[derive(Debug)]
pub struct ItemStore {
    path: PathBuf,
    policy: CorruptItemPolicy,
    write_lock: Mutex<()>,
}

impl ItemStore {
    /// Creates a store over the document at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, policy: CorruptItemPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a store from a [`StoreConfig`].
    #[must_use]
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.items_path(), config.corrupt_items)
    }

    /// Returns the path of the mapping document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the corrupt document policy.
    #[must_use]
    pub fn policy(&self) -> CorruptItemPolicy {
        self.policy
    }

    /// Reads the mapping document without applying the corrupt policy.
    ///
    /// Never fails: read and parse failures are reported through
    /// [`LoadOutcome::Unreadable`] and [`LoadOutcome::Corrupt`].
    pub async fn load(&self) -> ItemSnapshot {
        let outcome = match fs::read(&self.path).await {
            Ok(raw) => match serde_json::from_slice::<ItemMap>(&raw) {
                Ok(items) => {
                    return ItemSnapshot {
                        items,
                        outcome: LoadOutcome::Loaded,
                    };
                },
                Err(e) => LoadOutcome::Corrupt {
                    reason: e.to_string(),
                },
            },
            Err(e) if e.kind() == ErrorKind::NotFound => LoadOutcome::Missing,
            Err(e) => LoadOutcome::Unreadable {
                reason: e.to_string(),
            },
        };

        ItemSnapshot {
            items: ItemMap::new(),
            outcome,
        }
    }

    /// Loads the mapping and applies the corrupt document policy.
    ///
    /// # Errors
    ///
    /// Under [`CorruptItemPolicy::Reject`], returns
    /// [`Error::CorruptItemStore`] when the document does not parse and
    /// [`Error::UnreadableItemStore`] when it cannot be read.
    pub async fn load_items(&self) -> Result<ItemMap> {
        let snapshot = self.load().await;
        let (reason, unreadable) = match snapshot.outcome {
            LoadOutcome::Loaded | LoadOutcome::Missing => return Ok(snapshot.items),
            LoadOutcome::Corrupt { reason } => (reason, false),
            LoadOutcome::Unreadable { reason } => (reason, true),
        };

        match self.policy {
            CorruptItemPolicy::TreatAsEmpty => {
                tracing::warn!(
                    path = %self.path.display(),
                    reason = %reason,
                    unreadable,
                    "Item store could not be loaded, treating as empty"
                );
                Ok(ItemMap::new())
            },
            CorruptItemPolicy::Reject if unreadable => Err(Error::UnreadableItemStore {
                path: self.path.clone(),
                reason,
            }),
            CorruptItemPolicy::Reject => Err(Error::CorruptItemStore {
                path: self.path.clone(),
                reason,
            }),
        }
    }

    /// Looks up a single record.
    ///
    /// # Errors
    ///
    /// See [`ItemStore::load_items`].
    pub async fn get(&self, id: ItemId) -> Result<Option<Item>> {
        let mut items = self.load_items().await?;
        Ok(items.remove(&id))
    }

    /// Sets `id` to `item`, rewriting the whole document.
    ///
    /// # Errors
    ///
    /// See [`ItemStore::load_items`]; also fails if the document cannot be
    /// written.
    pub async fn put(&self, id: ItemId, item: Item) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut items = self.load_items().await?;
        items.insert(id, item);
        self.save(&items).await?;

        tracing::debug!(id, count = items.len(), "item stored");
        Ok(())
    }

    async fn save(&self, items: &ItemMap) -> Result<()> {
        let encoded = serde_json::to_vec(items)?;
        let tmp = self.temp_path();

        let written: std::io::Result<()> = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(&encoded).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp, &self.path).await
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp).await {
                tracing::debug!(
                    path = %tmp.display(),
                    error = %cleanup,
                    "temp file cleanup failed"
                );
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path
            .with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()))
    }
}

/// Returns `true` if `name` is a temporary sibling of the `items_file` document.
pub(crate) fn is_temp_name(items_file: &str, name: &str) -> bool {
    name.strip_prefix('.')
        .and_then(|rest| rest.strip_prefix(items_file))
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|rest| rest.strip_suffix(".tmp"))
        .is_some_and(|id| !id.is_empty())
}
