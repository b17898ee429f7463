//! # Local Mapping Resolver
//!
//! Reconciles the data items and manifests a job left in a local staging
//! directory with the output mapping entries of its configuration.
//!
//! ## Workflow
//!
//! 1. List data items and manifests under the staging path
//! 2. Seed one source per data item
//! 3. Attach manifests by base name (orphaned manifest is fatal)
//! 4. Clone sources once per matching configuration entry
//! 5. Fail on configured sources without a data item, unless the job run
//!    being processed had failed
//! 6. Optionally hand the result to a [`SourceSlicer`]

use bridge_traits::StagingArea;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::configuration::MappingConfiguration;
use crate::error::Result;
use crate::resolution::{apply_slicing, reconcile, ResolvedSources, SourceSlicer};
use crate::source::{MappingSource, SourceItem};

pub struct LocalMappingResolver {
    staging: Arc<dyn StagingArea>,
    slicer: Option<Arc<dyn SourceSlicer>>,
}

impl LocalMappingResolver {
    pub fn new(staging: Arc<dyn StagingArea>) -> Self {
        Self {
            staging,
            slicer: None,
        }
    }

    pub fn with_slicer(mut self, slicer: Arc<dyn SourceSlicer>) -> Self {
        self.slicer = Some(slicer);
        self
    }

    /// Resolve the mapping sources found under `path_prefix`
    ///
    /// # Errors
    ///
    /// - `OrphanedManifest` when a manifest has no data item
    /// - `MissingMappedSource` when a configured source has no data item and
    ///   `is_failed_job_run` is false
    /// - `SlicerUnavailable` when `use_slicing` is set without a slicer
    #[instrument(skip(self, configurations), fields(configurations = configurations.len()))]
    pub async fn resolve_mapping_sources(
        &self,
        path_prefix: &str,
        configurations: &[MappingConfiguration],
        is_failed_job_run: bool,
        use_slicing: bool,
    ) -> Result<ResolvedSources> {
        let data_items = self.staging.list_data_items(path_prefix).await?;
        let manifests = self.staging.list_manifest_items(path_prefix).await?;

        info!(
            data_items = data_items.len(),
            manifests = manifests.len(),
            "Resolving local mapping sources"
        );

        let seeds = data_items
            .into_iter()
            .map(|item| MappingSource::new(SourceItem::Physical(item)))
            .collect();

        let resolved = reconcile(seeds, manifests, configurations, is_failed_job_run)?;
        apply_slicing(resolved, self.slicer.as_deref(), use_slicing).await
    }
}
