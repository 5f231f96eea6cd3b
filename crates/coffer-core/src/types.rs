//! Common types used across Coffer.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of an item record.
pub type ItemId = i64;

/// Name of a file directly under the storage root.
///
/// Construction rejects anything that could resolve outside the root, so a
/// `FileName` can always be joined onto the root path as a single component.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileName(pub(crate) String);

impl FileName {
    /// Validates and wraps a file name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFileName`] if the name is empty, is `.` or
    /// `..`, or contains a path separator or NUL byte.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("name is empty")
        } else if name == "." || name == ".." {
            Some("name refers to a directory")
        } else if name.contains(['/', '\\']) {
            Some("name contains a path separator")
        } else if name.contains('\0') {
            Some("name contains a NUL byte")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(Error::InvalidFileName { name, reason }),
            None => Ok(Self(name)),
        }
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for FileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FileName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for FileName {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl From<FileName> for String {
    fn from(name: FileName) -> Self {
        name.0
    }
}

/// A record in the item mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Display name.
    pub name: String,
    /// Item level.
    pub level: i64,
    /// Optional free-form description.
    #[serde(default)]
    pub desc: Option<String>,
}

impl Item {
    /// Creates a new item without a description.
    #[must_use]
    pub fn new(name: impl Into<String>, level: i64) -> Self {
        Self {
            name: name.into(),
            level,
            desc: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }
}
