//! Resolved units of work.

use bridge_traits::staging::normalize_name;
use bridge_traits::PhysicalItem;
use serde::{Deserialize, Serialize};

use crate::configuration::MappingConfiguration;

const CSV_EXTENSION: &str = ".csv";

/// An object inside a workspace, referenced by name rather than discovered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceItem {
    pub name: String,
    pub workspace_id: String,
    /// Object name inside the workspace (table, view or blob prefix)
    pub data_object: String,
}

impl WorkspaceItem {
    pub fn new(name: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            data_object: name.clone(),
            name,
            workspace_id: workspace_id.into(),
        }
    }
}

/// The data behind a mapping source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceItem {
    /// Found by enumerating a staging path
    Physical(PhysicalItem),
    /// Synthesized from declared intent or manifest evidence
    Workspace(WorkspaceItem),
}

impl SourceItem {
    /// Normalised name used for matching
    pub fn source_name(&self) -> &str {
        match self {
            SourceItem::Physical(item) => item.source_name(),
            SourceItem::Workspace(item) => normalize_name(&item.name),
        }
    }
}

/// A data item with its optional manifest and configuration entry
///
/// Manifest and configuration are attached while a resolver runs; afterwards
/// the value is only read. A physical item matched by several configuration
/// entries yields one clone per entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingSource {
    source: SourceItem,
    manifest: Option<PhysicalItem>,
    configuration: Option<MappingConfiguration>,
}

impl MappingSource {
    pub fn new(source: SourceItem) -> Self {
        Self {
            source,
            manifest: None,
            configuration: None,
        }
    }

    pub fn with_manifest(mut self, manifest: PhysicalItem) -> Self {
        self.set_manifest(manifest);
        self
    }

    pub fn with_configuration(mut self, configuration: MappingConfiguration) -> Self {
        self.set_mapping(configuration);
        self
    }

    pub(crate) fn set_manifest(&mut self, manifest: PhysicalItem) {
        self.manifest = Some(manifest);
    }

    pub(crate) fn set_mapping(&mut self, configuration: MappingConfiguration) {
        self.configuration = Some(configuration);
    }

    pub fn source(&self) -> &SourceItem {
        &self.source
    }

    pub fn source_name(&self) -> &str {
        self.source.source_name()
    }

    pub fn manifest(&self) -> Option<&PhysicalItem> {
        self.manifest.as_ref()
    }

    pub fn configuration(&self) -> Option<&MappingConfiguration> {
        self.configuration.as_ref()
    }

    /// Destination table id
    ///
    /// A configured destination wins. Otherwise a source named like a table
    /// id (`out.c-main.orders`, optionally with `.csv`) is used as is, and any
    /// other name is placed into `default_bucket`.
    pub fn destination(&self, default_bucket: Option<&str>) -> Option<String> {
        if let Some(destination) = self
            .configuration
            .as_ref()
            .and_then(|c| c.destination.as_deref())
            .filter(|d| !d.is_empty())
        {
            return Some(destination.to_string());
        }

        let name = self.source_name();
        let base = name.strip_suffix(CSV_EXTENSION).unwrap_or(name);

        if looks_like_table_id(base) {
            return Some(base.to_string());
        }

        default_bucket.map(|bucket| format!("{}.{}", bucket, base))
    }
}

fn looks_like_table_id(name: &str) -> bool {
    let mut parts = name.splitn(3, '.');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some("in" | "out"), Some(bucket), Some(table))
            if bucket.starts_with("c-") && !table.is_empty()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn physical(name: &str) -> MappingSource {
        MappingSource::new(SourceItem::Physical(PhysicalItem::new(name, "out/tables")))
    }

    #[test]
    fn test_configured_destination_wins() {
        let source = physical("orders.csv")
            .with_configuration(MappingConfiguration::new("orders.csv").with_destination("out.c-x.y"));
        assert_eq!(
            source.destination(Some("out.c-main")),
            Some("out.c-x.y".to_string())
        );
    }

    #[test]
    fn test_destination_from_table_id_name() {
        let source = physical("out.c-main.orders.csv");
        assert_eq!(source.destination(None), Some("out.c-main.orders".to_string()));
    }

    #[test]
    fn test_destination_from_default_bucket() {
        let source = physical("orders.csv");
        assert_eq!(
            source.destination(Some("out.c-main")),
            Some("out.c-main.orders".to_string())
        );
        assert_eq!(source.destination(None), None);
    }

    #[test]
    fn test_sliced_directory_name_is_normalised() {
        let source = physical("events/");
        assert_eq!(source.source_name(), "events");
        assert_eq!(
            source.destination(Some("out.c-main")),
            Some("out.c-main.events".to_string())
        );
    }

    #[test]
    fn test_workspace_item_data_object() {
        let item = WorkspaceItem::new("orders", "ws-1");
        assert_eq!(item.data_object, "orders");
        assert_eq!(SourceItem::Workspace(item).source_name(), "orders");
    }
}
