//! Static category list served as a read-only resource.
//!
//! The list is read from a JSON file next to the deployed binary when one
//! exists. Otherwise a fixed built-in list is returned. The list is never
//! derived from the categories actually present in the expense table.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// URI the category list is published under
pub const CATEGORIES_URI: &str = "expense:///categories";

/// Media type of the category document
pub const CATEGORIES_MIME_TYPE: &str = "application/json";

/// Built-in categories used when no category file is deployed
pub const DEFAULT_CATEGORIES: [&str; 10] = [
    "Food & Dining",
    "Transportation",
    "Shopping",
    "Entertainment",
    "Bills & Utilities",
    "Healthcare",
    "Travel",
    "Education",
    "Business",
    "Other",
];

/// Shape of the category document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryList {
    pub categories: Vec<String>,
}

impl Default for CategoryList {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Source of the category document
#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    path: PathBuf,
}

impl CategoryCatalog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The category document as a JSON string.
    ///
    /// File contents are returned verbatim. A missing file yields the
    /// built-in list pretty-printed with two-space indentation; any other
    /// read error is returned.
    pub fn read(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                debug!(path = ?self.path, "Serving categories from file");
                Ok(contents)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?self.path, "Category file not found, using built-in list");
                Self::fallback()
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read category file {}", self.path.display())),
        }
    }

    fn fallback() -> Result<String> {
        serde_json::to_string_pretty(&CategoryList::default()).context("Failed to serialize category list")
    }
}
