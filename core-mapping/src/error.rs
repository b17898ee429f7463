use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("Found orphaned table manifest: \"{manifest}\"")]
    OrphanedManifest { manifest: String },

    #[error("Table sources not found: {}", quote_list(.sources))]
    MissingMappedSource { sources: Vec<String> },

    #[error("Table with metadata key: \"{key}\" and value: \"{value}\" was not found.")]
    SourceNotFound { key: String, value: String },

    #[error(
        "More than one table with metadata key: \"{key}\" and value: \"{value}\" was found: {}.",
        .candidates.join(",")
    )]
    AmbiguousSource {
        key: String,
        value: String,
        candidates: Vec<String>,
    },

    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    #[error("Slicing was requested but no slicer is configured")]
    SlicerUnavailable,

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

fn quote_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("\"{}\"", item))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, MappingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_source_message_lists_every_name() {
        let err = MappingError::MissingMappedSource {
            sources: vec!["orders.csv".to_string(), "events".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Table sources not found: \"orders.csv\", \"events\""
        );
    }

    #[test]
    fn test_ambiguous_source_message() {
        let err = MappingError::AmbiguousSource {
            key: "bdm.scaffold.tag".to_string(),
            value: "test_table".to_string(),
            candidates: vec!["table1".to_string(), "table2".to_string()],
        };
        assert!(err.to_string().ends_with("was found: table1,table2."));
    }
}
