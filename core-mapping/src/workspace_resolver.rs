//! # Workspace Mapping Resolver
//!
//! A workspace offers no generic listing of its objects, so sources are
//! seeded from declared intent plus manifest evidence instead of from an
//! enumeration:
//! - one synthesized source per configured source name
//! - one synthesized source per manifest whose base name no configuration
//!   entry declared
//!
//! Reconciliation afterwards is shared with the local resolver.

use bridge_traits::StagingArea;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::configuration::MappingConfiguration;
use crate::error::Result;
use crate::resolution::{apply_slicing, reconcile, ResolvedSources, SourceSlicer};
use crate::source::{MappingSource, SourceItem, WorkspaceItem};

pub struct WorkspaceMappingResolver {
    workspace_id: String,
    staging: Arc<dyn StagingArea>,
    slicer: Option<Arc<dyn SourceSlicer>>,
}

impl WorkspaceMappingResolver {
    pub fn new(workspace_id: impl Into<String>, staging: Arc<dyn StagingArea>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            staging,
            slicer: None,
        }
    }

    pub fn with_slicer(mut self, slicer: Arc<dyn SourceSlicer>) -> Self {
        self.slicer = Some(slicer);
        self
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    /// Resolve workspace mapping sources
    ///
    /// Same contract as
    /// [`LocalMappingResolver::resolve_mapping_sources`](crate::LocalMappingResolver::resolve_mapping_sources).
    #[instrument(skip(self, configurations), fields(workspace_id = %self.workspace_id))]
    pub async fn resolve_mapping_sources(
        &self,
        path_prefix: &str,
        configurations: &[MappingConfiguration],
        is_failed_job_run: bool,
        use_slicing: bool,
    ) -> Result<ResolvedSources> {
        let manifests = self.staging.list_manifest_items(path_prefix).await?;

        let mut seeded = HashSet::new();
        let mut seeds = Vec::new();

        let declared = configurations.iter().map(|c| c.source_name());
        let evidenced = manifests.iter().map(|m| m.source_name());
        for name in declared.chain(evidenced) {
            if seeded.insert(name.to_string()) {
                seeds.push(MappingSource::new(SourceItem::Workspace(WorkspaceItem::new(
                    name,
                    self.workspace_id.clone(),
                ))));
            }
        }

        info!(
            sources = seeds.len(),
            manifests = manifests.len(),
            "Resolving workspace mapping sources"
        );

        let resolved = reconcile(seeds, manifests, configurations, is_failed_job_run)?;
        apply_slicing(resolved, self.slicer.as_deref(), use_slicing).await
    }
}
