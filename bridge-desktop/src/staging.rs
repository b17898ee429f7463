//! Local Staging Area using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    staging::{ManifestFields, PhysicalItem, StagingArea},
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Tokio-based staging area over a local data directory
///
/// Paths handed to the [`StagingArea`] methods are resolved relative to the
/// data directory. Entries whose name ends with `.manifest` are manifests;
/// every other entry, including the directories that hold sliced tables, is a
/// data item. Results are sorted by name so resolution order is stable across
/// filesystems.
pub struct LocalStagingArea {
    data_dir: PathBuf,
}

impl LocalStagingArea {
    /// Create a staging area rooted at `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Root data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Convert std::io::Error to BridgeError
    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }

    async fn list_entries(&self, path: &str, manifests: bool) -> Result<Vec<PhysicalItem>> {
        let dir = self.data_dir.join(path);
        let dir_name = dir.to_string_lossy().into_owned();

        let mut items = Vec::new();
        let mut read_dir = fs::read_dir(&dir).await.map_err(Self::map_io_error)?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(Self::map_io_error)?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let item = PhysicalItem::new(name, dir_name.clone());
            if item.is_manifest() == manifests {
                items.push(item);
            }
        }

        items.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(path = ?dir, count = items.len(), manifests, "Listed staging directory");
        Ok(items)
    }
}

#[async_trait]
impl StagingArea for LocalStagingArea {
    async fn list_data_items(&self, path: &str) -> Result<Vec<PhysicalItem>> {
        self.list_entries(path, false).await
    }

    async fn list_manifest_items(&self, path: &str) -> Result<Vec<PhysicalItem>> {
        self.list_entries(path, true).await
    }

    async fn read_manifest(&self, item: &PhysicalItem) -> Result<ManifestFields> {
        let data = fs::read(&item.path_name)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = %item.path_name, size = data.len(), "Read manifest");

        let value: serde_json::Value =
            serde_json::from_slice(&data).map_err(|e| BridgeError::InvalidManifest {
                path: item.path_name.clone(),
                message: e.to_string(),
            })?;

        match value {
            serde_json::Value::Object(fields) => Ok(fields),
            other => Err(BridgeError::InvalidManifest {
                path: item.path_name.clone(),
                message: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
