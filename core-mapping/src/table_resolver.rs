//! Input table resolution.
//!
//! An input mapping either names its source table directly or describes it
//! with a metadata criterion. Search-based entries are resolved against the
//! storage backend and must match exactly one table.

use bridge_traits::StorageBackend;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::{MappingError, Result};
use crate::input::{InputTableMapping, SourceSearch};

pub struct TableResolver {
    storage: Arc<dyn StorageBackend>,
}

impl TableResolver {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Replace every search criterion with the concrete table id it matches
    ///
    /// Entries are returned in input order. The first entry that cannot be
    /// resolved aborts the whole call.
    #[instrument(skip(self, mappings), fields(mappings = mappings.len()))]
    pub async fn resolve(&self, mappings: Vec<InputTableMapping>) -> Result<Vec<InputTableMapping>> {
        let mut resolved = Vec::with_capacity(mappings.len());

        for mut mapping in mappings {
            if mapping.source_name().is_some() {
                resolved.push(mapping);
                continue;
            }

            let search = mapping.source_search.take().ok_or_else(|| {
                MappingError::InvalidMapping(
                    "Input mapping needs either \"source\" or \"source_search\"".to_string(),
                )
            })?;

            let table_id = self.search_single(&search).await?;
            info!(
                "Using input table \"{}\" found by metadata key \"{}\" and value \"{}\"",
                table_id, search.key, search.value
            );
            mapping.source = Some(table_id);
            resolved.push(mapping);
        }

        Ok(resolved)
    }

    async fn search_single(&self, search: &SourceSearch) -> Result<String> {
        let mut candidates = self
            .storage
            .search_by_metadata(&search.key, &search.value)
            .await?;

        debug!(candidates = candidates.len(), key = %search.key, "Metadata search finished");

        match candidates.len() {
            0 => Err(MappingError::SourceNotFound {
                key: search.key.clone(),
                value: search.value.clone(),
            }),
            1 => Ok(candidates.remove(0).id),
            _ => Err(MappingError::AmbiguousSource {
                key: search.key.clone(),
                value: search.value.clone(),
                candidates: candidates.into_iter().map(|c| c.id).collect(),
            }),
        }
    }
}
