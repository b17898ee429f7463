//! Staging Area Abstractions
//!
//! A staging area is the transfer medium a job reads from or writes to: a
//! local data directory, or a workspace owned by the storage service. The core
//! only needs to enumerate it and read manifests from it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Suffix that marks a manifest sidecar (`<item>.manifest`)
pub const MANIFEST_SUFFIX: &str = ".manifest";

/// Decoded manifest fields
pub type ManifestFields = serde_json::Map<String, serde_json::Value>;

/// Strip trailing path separators from an item or source name
///
/// Sliced tables are directories and are often listed or referenced as
/// `orders/`; both forms key to `orders`.
pub fn normalize_name(name: &str) -> &str {
    name.trim_end_matches('/')
}

/// Name of the data item a manifest describes
///
/// `orders.csv.manifest` maps to `orders.csv`. Names without the suffix are
/// only normalised.
pub fn manifest_base_name(name: &str) -> &str {
    let name = normalize_name(name);
    normalize_name(name.strip_suffix(MANIFEST_SUFFIX).unwrap_or(name))
}

/// An object found under a staging path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhysicalItem {
    /// Base name (`orders.csv`, `orders.csv.manifest`)
    pub name: String,
    /// Directory the item was found in
    pub path: String,
    /// Fully qualified locator, usable as is to open or upload the item
    ///
    /// Local staging reports paths that already include its data directory.
    pub path_name: String,
}

impl PhysicalItem {
    /// Create an item, deriving `path_name` from `path` and `name`
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        let name = name.into();
        let path = path.into();
        let path_name = if path.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", path.trim_end_matches('/'), name)
        };
        Self {
            name,
            path,
            path_name,
        }
    }

    /// Whether the item follows the manifest naming convention
    pub fn is_manifest(&self) -> bool {
        normalize_name(&self.name).ends_with(MANIFEST_SUFFIX)
    }

    /// Key used to match items, manifests and configured source names
    pub fn source_name(&self) -> &str {
        manifest_base_name(&self.name)
    }
}

/// Staging area trait
///
/// Enumeration is shallow: only direct children of `path` are returned.
/// Implementations must not return manifests from `list_data_items`.
#[async_trait]
pub trait StagingArea: Send + Sync {
    /// List data items (everything that is not a manifest)
    async fn list_data_items(&self, path: &str) -> Result<Vec<PhysicalItem>>;

    /// List manifest items
    async fn list_manifest_items(&self, path: &str) -> Result<Vec<PhysicalItem>>;

    /// Read and decode a manifest
    async fn read_manifest(&self, item: &PhysicalItem) -> Result<ManifestFields>;
}
