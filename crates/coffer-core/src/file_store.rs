//! Files under the storage root.
//!
//! Every operation is a direct pass-through to the filesystem. Writers to the
//! same name are not coordinated; the last one to finish wins. Listings hide
//! the item store's in-flight temporary files but include the item document
//! itself.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::item_store::is_temp_name;
use crate::types::FileName;

/// A file opened for download.
#[derive(Debug)]
pub struct OpenedFile {
    /// Handle positioned at the start of the file.
    pub file: File,
    /// Size in bytes at open time.
    pub len: u64,
}

/// Filesystem-backed file store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    max_upload_bytes: Option<u64>,
    items_file: Option<FileName>,
}

impl FileStore {
    /// Creates a store over `root` with no upload limit.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_upload_bytes: None,
            items_file: None,
        }
    }

    /// Creates a store from a [`StoreConfig`].
    #[must_use]
    pub fn from_config(config: &StoreConfig) -> Self {
        let mut store =
            Self::new(config.root.clone()).with_max_upload_bytes(config.max_upload_bytes);
        store.items_file = Some(config.items_file.clone());
        store
    }

    /// Sets the maximum number of bytes a single upload may write.
    #[must_use]
    pub fn with_max_upload_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    /// Returns the storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &FileName) -> PathBuf {
        self.root.join(name.as_str())
    }

    /// Streams `reader` into `name`, creating or truncating it.
    ///
    /// Returns the number of bytes written. If the configured upload limit is
    /// exceeded the partial file is removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLarge`] when over the limit, or an I/O error.
    pub async fn write<R>(&self, name: &FileName, reader: R) -> Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let path = self.path_of(name);
        let mut file = File::create(&path).await?;

        let written = match self.max_upload_bytes {
            Some(limit) => {
                let mut limited = reader.take(limit.saturating_add(1));
                let written = tokio::io::copy(&mut limited, &mut file).await?;
                if written > limit {
                    drop(file);
                    if let Err(e) = fs::remove_file(&path).await {
                        tracing::warn!(file = %name, error = %e, "partial upload cleanup failed");
                    }
                    tracing::debug!(file = %name, limit, "upload exceeded limit");
                    return Err(Error::PayloadTooLarge { limit });
                }
                written
            },
            None => {
                let mut reader = reader;
                tokio::io::copy(&mut reader, &mut file).await?
            },
        };

        file.flush().await?;
        tracing::debug!(file = %name, bytes = written, "file written");
        Ok(written)
    }

    /// Writes `contents` as the full contents of `name`.
    ///
    /// # Errors
    ///
    /// See [`FileStore::write`].
    pub async fn put(&self, name: &FileName, contents: &[u8]) -> Result<u64> {
        self.write(name, contents).await
    }

    /// Lists the names of entries directly under the root, sorted.
    ///
    /// Names that are not valid UTF-8 are skipped, as are temporary files
    /// of the item document when the store was built from a [`StoreConfig`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the root cannot be read.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            match entry.file_name().into_string() {
                Ok(name) if self.is_item_temp(&name) => {},
                Ok(name) => names.push(name),
                Err(raw) => tracing::debug!(name = ?raw, "skipping non-UTF-8 entry"),
            }
        }

        names.sort();
        Ok(names)
    }

    /// Opens `name` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNotFound`] if the file is missing or is a
    /// directory, or an I/O error.
    pub async fn open(&self, name: &FileName) -> Result<OpenedFile> {
        let path = self.path_of(name);
        let file = File::open(&path)
            .await
            .map_err(|e| not_found_or_io(e, name))?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(Error::file_not_found(name.as_str()));
        }

        Ok(OpenedFile {
            file,
            len: metadata.len(),
        })
    }

    /// Reads the full contents of `name`.
    ///
    /// # Errors
    ///
    /// See [`FileStore::open`].
    pub async fn read(&self, name: &FileName) -> Result<Vec<u8>> {
        let OpenedFile { mut file, len } = self.open(name).await?;
        let mut contents = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
        file.read_to_end(&mut contents).await?;
        Ok(contents)
    }

    /// Removes `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNotFound`] if nothing exists under that name, or
    /// an I/O error for any other failure.
    pub async fn delete(&self, name: &FileName) -> Result<()> {
        fs::remove_file(self.path_of(name))
            .await
            .map_err(|e| not_found_or_io(e, name))?;
        tracing::debug!(file = %name, "file removed");
        Ok(())
    }

    fn is_item_temp(&self, name: &str) -> bool {
        self.items_file
            .as_ref()
            .is_some_and(|items| is_temp_name(items.as_str(), name))
    }
}

fn not_found_or_io(e: std::io::Error, name: &FileName) -> Error {
    if e.kind() == ErrorKind::NotFound {
        Error::file_not_found(name.as_str())
    } else {
        Error::Io(e)
    }
}
