//! Output mapping configuration entries.
//!
//! The job configuration arrives already validated; this module only gives the
//! entries a typed shape and derives the backend-agnostic load options from
//! them.

use bridge_traits::staging::normalize_name;
use bridge_traits::{
    DeleteWhere, DeleteWhereOperator, LoadOptions, LoadSource, ManifestFields, MetadataEntry,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{MappingError, Result};

/// One declared output mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfiguration {
    /// Name of the physical item this entry maps
    pub source: String,
    /// Destination table id
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub incremental: bool,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub delete_where_column: Option<String>,
    #[serde(default)]
    pub delete_where_operator: DeleteWhereOperator,
    #[serde(default)]
    pub delete_where_values: Vec<String>,
    /// Table metadata applied after a successful load
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
    /// Column metadata applied after a successful load, keyed by column
    #[serde(default)]
    pub column_metadata: BTreeMap<String, Vec<MetadataEntry>>,
}

impl MappingConfiguration {
    /// Minimal entry mapping `source` with default options
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: None,
            incremental: false,
            primary_key: Vec::new(),
            columns: Vec::new(),
            delete_where_column: None,
            delete_where_operator: DeleteWhereOperator::default(),
            delete_where_values: Vec::new(),
            metadata: Vec::new(),
            column_metadata: BTreeMap::new(),
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Parse a single entry from the configuration tree
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let configuration: Self = serde_json::from_value(value.clone())
            .map_err(|e| MappingError::InvalidMapping(e.to_string()))?;

        if configuration.source_name().is_empty() {
            return Err(MappingError::InvalidMapping(
                "Output mapping source cannot be empty".to_string(),
            ));
        }

        Ok(configuration)
    }

    /// Parse the list of output mapping entries
    ///
    /// `null` is treated as an empty list.
    pub fn parse_list(value: &serde_json::Value) -> Result<Vec<Self>> {
        match value {
            serde_json::Value::Null => Ok(Vec::new()),
            serde_json::Value::Array(entries) => entries.iter().map(Self::from_value).collect(),
            _ => Err(MappingError::InvalidMapping(
                "Output mapping must be a list of entries".to_string(),
            )),
        }
    }

    /// Overlay this entry on the fields of a manifest sidecar
    ///
    /// The manifest supplies defaults; any option set on this entry wins.
    /// The manifest's own `source` key, if any, is ignored.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMapping` when the manifest fields do not describe a
    /// mapping entry.
    pub fn merge_manifest(&self, manifest: &ManifestFields) -> Result<Self> {
        let mut fields = manifest.clone();
        fields.insert(
            "source".to_string(),
            serde_json::Value::String(self.source.clone()),
        );
        let base: Self = serde_json::from_value(serde_json::Value::Object(fields)).map_err(|e| {
            MappingError::InvalidMapping(format!("Invalid manifest for \"{}\": {}", self.source, e))
        })?;

        let (delete_where_column, delete_where_operator, delete_where_values) =
            if self.delete_where_column.is_some() {
                (
                    self.delete_where_column.clone(),
                    self.delete_where_operator,
                    self.delete_where_values.clone(),
                )
            } else {
                (
                    base.delete_where_column,
                    base.delete_where_operator,
                    base.delete_where_values,
                )
            };

        Ok(Self {
            source: self.source.clone(),
            destination: self.destination.clone().or(base.destination),
            incremental: self.incremental || base.incremental,
            primary_key: prefer_set(&self.primary_key, base.primary_key),
            columns: prefer_set(&self.columns, base.columns),
            delete_where_column,
            delete_where_operator,
            delete_where_values,
            metadata: prefer_set(&self.metadata, base.metadata),
            column_metadata: if self.column_metadata.is_empty() {
                base.column_metadata
            } else {
                self.column_metadata.clone()
            },
        })
    }

    /// Source name used to match physical items
    pub fn source_name(&self) -> &str {
        normalize_name(&self.source)
    }

    /// Delete-where clause, when a column is configured
    pub fn delete_where(&self) -> Option<DeleteWhere> {
        self.delete_where_column.as_ref().map(|column| DeleteWhere {
            column: column.clone(),
            operator: self.delete_where_operator,
            values: self.delete_where_values.clone(),
        })
    }

    /// Load options for writing this entry from `source`
    pub fn load_options(&self, source: LoadSource) -> LoadOptions {
        let options = LoadOptions::new(source)
            .with_incremental(self.incremental)
            .with_primary_key(self.primary_key.clone())
            .with_columns(self.columns.clone());

        match self.delete_where() {
            Some(delete_where) => options.with_delete_where(delete_where),
            None => options,
        }
    }
}

fn prefer_set<T: Clone>(configured: &[T], manifest: Vec<T>) -> Vec<T> {
    if configured.is_empty() {
        manifest
    } else {
        configured.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_list() {
        let raw = json!([
            {"source": "orders.csv", "destination": "out.c-main.orders", "incremental": true,
             "primary_key": ["id"]},
            {"source": "events/"}
        ]);

        let configurations = MappingConfiguration::parse_list(&raw).unwrap();
        assert_eq!(configurations.len(), 2);
        assert_eq!(
            configurations[0].destination.as_deref(),
            Some("out.c-main.orders")
        );
        assert!(configurations[0].incremental);
        assert_eq!(configurations[1].source_name(), "events");
        assert!(!configurations[1].incremental);
    }

    #[test]
    fn test_parse_null_is_empty() {
        let configurations = MappingConfiguration::parse_list(&serde_json::Value::Null).unwrap();
        assert!(configurations.is_empty());
    }

    #[test]
    fn test_parse_rejects_missing_source() {
        let err = MappingConfiguration::parse_list(&json!([{"destination": "out.c-main.x"}]))
            .unwrap_err();
        assert!(matches!(err, MappingError::InvalidMapping(_)));

        let err = MappingConfiguration::parse_list(&json!([{"source": "/"}])).unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_parse_rejects_non_list() {
        let err = MappingConfiguration::parse_list(&json!({"source": "a"})).unwrap_err();
        assert!(matches!(err, MappingError::InvalidMapping(_)));
    }

    #[test]
    fn test_load_options() {
        let raw = json!({
            "source": "orders.csv",
            "incremental": true,
            "primary_key": ["id"],
            "delete_where_column": "status",
            "delete_where_operator": "ne",
            "delete_where_values": ["open"]
        });
        let configuration = MappingConfiguration::from_value(&raw).unwrap();

        let options = configuration.load_options(LoadSource::File {
            file_id: "123".to_string(),
        });
        assert!(options.incremental);
        assert_eq!(options.primary_key, vec!["id".to_string()]);
        let delete_where = options.delete_where.unwrap();
        assert_eq!(delete_where.column, "status");
        assert_eq!(delete_where.operator, DeleteWhereOperator::Ne);
        assert_eq!(delete_where.values, vec!["open".to_string()]);
    }

    #[test]
    fn test_load_options_without_delete_where() {
        let options = MappingConfiguration::new("orders.csv").load_options(LoadSource::File {
            file_id: "1".to_string(),
        });
        assert!(options.delete_where.is_none());
        assert!(!options.incremental);
    }

    fn manifest(value: serde_json::Value) -> ManifestFields {
        match value {
            serde_json::Value::Object(fields) => fields,
            _ => panic!("manifest must be an object"),
        }
    }

    #[test]
    fn test_manifest_fills_unset_options() {
        let fields = manifest(json!({
            "destination": "out.c-main.orders",
            "incremental": true,
            "primary_key": ["id"],
            "metadata": [{"key": "owner", "value": "sales"}]
        }));

        let merged = MappingConfiguration::new("orders.csv")
            .merge_manifest(&fields)
            .unwrap();

        assert_eq!(merged.source, "orders.csv");
        assert_eq!(merged.destination.as_deref(), Some("out.c-main.orders"));
        assert!(merged.incremental);
        assert_eq!(merged.primary_key, vec!["id".to_string()]);
        assert_eq!(merged.metadata, vec![MetadataEntry::new("owner", "sales")]);
    }

    #[test]
    fn test_configured_options_override_manifest() {
        let fields = manifest(json!({
            "source": "renamed.csv",
            "destination": "out.c-main.from_manifest",
            "primary_key": ["id"],
            "delete_where_column": "status",
            "delete_where_values": ["open"]
        }));
        let mut configuration =
            MappingConfiguration::new("orders.csv").with_destination("out.c-main.orders");
        configuration.primary_key = vec!["order_id".to_string()];

        let merged = configuration.merge_manifest(&fields).unwrap();

        assert_eq!(merged.source, "orders.csv");
        assert_eq!(merged.destination.as_deref(), Some("out.c-main.orders"));
        assert_eq!(merged.primary_key, vec!["order_id".to_string()]);
        assert_eq!(merged.delete_where_column.as_deref(), Some("status"));
        assert_eq!(merged.delete_where_values, vec!["open".to_string()]);
    }

    #[test]
    fn test_malformed_manifest() {
        let fields = manifest(json!({"incremental": "sometimes"}));
        let err = MappingConfiguration::new("orders.csv")
            .merge_manifest(&fields)
            .unwrap_err();
        assert!(matches!(err, MappingError::InvalidMapping(_)));
        assert!(err.to_string().contains("orders.csv"));
    }
}
