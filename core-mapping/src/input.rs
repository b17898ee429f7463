//! Input table mapping entries.

use bridge_traits::staging::normalize_name;
use serde::{Deserialize, Serialize};

use crate::error::{MappingError, Result};

/// Metadata criterion identifying a table by search instead of by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSearch {
    pub key: String,
    pub value: String,
}

/// One declared input table mapping
///
/// Options this layer does not interpret are carried in `options` and
/// serialized back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputTableMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_search: Option<SourceSearch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Lower bound for incremental reads; `"adaptive"` defers to stored state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_since: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl InputTableMapping {
    pub fn with_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            source_search: None,
            destination: None,
            changed_since: None,
            columns: Vec::new(),
            options: serde_json::Map::new(),
        }
    }

    pub fn with_search(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            source: None,
            source_search: Some(SourceSearch {
                key: key.into(),
                value: value.into(),
            }),
            ..Self::with_source("")
        }
    }

    /// Parse the list of input table mapping entries
    pub fn parse_list(value: &serde_json::Value) -> Result<Vec<Self>> {
        match value {
            serde_json::Value::Null => Ok(Vec::new()),
            serde_json::Value::Array(_) => serde_json::from_value(value.clone())
                .map_err(|e| MappingError::InvalidMapping(e.to_string())),
            _ => Err(MappingError::InvalidMapping(
                "Input mapping must be a list of entries".to_string(),
            )),
        }
    }

    /// Concrete source table id, once known
    pub fn source_name(&self) -> Option<&str> {
        self.source
            .as_deref()
            .map(normalize_name)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_keeps_unknown_options() {
        let raw = json!([
            {"source": "in.c-main.orders", "changed_since": "adaptive", "limit": 10},
            {"source_search": {"key": "bdm.scaffold.tag", "value": "orders"}}
        ]);

        let mappings = InputTableMapping::parse_list(&raw).unwrap();
        assert_eq!(mappings[0].source_name(), Some("in.c-main.orders"));
        assert_eq!(mappings[0].changed_since.as_deref(), Some("adaptive"));
        assert_eq!(mappings[0].options.get("limit"), Some(&json!(10)));
        assert_eq!(mappings[1].source_name(), None);
        assert_eq!(
            mappings[1].source_search.as_ref().map(|s| s.key.as_str()),
            Some("bdm.scaffold.tag")
        );

        let back = serde_json::to_value(&mappings[0]).unwrap();
        assert_eq!(back["limit"], 10);
        assert!(back.get("source_search").is_none());
    }

    #[test]
    fn test_with_search_has_no_source() {
        let mapping = InputTableMapping::with_search("k", "v");
        assert!(mapping.source.is_none());
        assert_eq!(mapping.source_name(), None);
    }
}
