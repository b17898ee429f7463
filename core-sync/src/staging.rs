//! # Staging Strategies
//!
//! Picks the transfer strategy for a staging type tag.
//!
//! ## Overview
//!
//! A staging type (`local`, `workspace-snowflake`, ...) is looked up once in a
//! [`StrategyFactoryConfig`] and turned into a [`TableStrategy`] or
//! [`FileStrategy`] value. Callers then work with the returned enum; nothing
//! downstream inspects the tag again.
//!
//! Table strategies for workspace staging additionally require the project to
//! have the workspace backend enabled.

use bridge_traits::{
    FileUploadOptions, LoadDestination, LoadSource, ManifestFields, PhysicalItem, StagingArea,
    StorageBackend,
};
use core_mapping::{
    LocalMappingResolver, MappingConfiguration, MappingError, MappingSource, ResolvedSources,
    SourceItem, SourceSlicer, WorkspaceMappingResolver,
};
use core_runtime::config::{CoreConfig, WorkspaceStaging};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::load_task::{LoadTask, MetadataOperation, DEFAULT_METADATA_PROVIDER};
use crate::{Result, SyncError};

// ============================================================================
// Lookup Table
// ============================================================================

/// Which resolver family a staging type uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
    Local,
    Workspace,
}

/// What a staging type tag stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingDefinition {
    pub mapping_kind: MappingKind,
    /// Workspace backend the project must support, if any
    pub workspace_backend: Option<String>,
}

impl StagingDefinition {
    pub fn local() -> Self {
        Self {
            mapping_kind: MappingKind::Local,
            workspace_backend: None,
        }
    }

    pub fn workspace(backend: impl Into<String>) -> Self {
        Self {
            mapping_kind: MappingKind::Workspace,
            workspace_backend: Some(backend.into()),
        }
    }
}

/// Staging type lookup table and project capabilities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFactoryConfig {
    pub definitions: BTreeMap<String, StagingDefinition>,
    pub project_backends: Vec<String>,
}

impl Default for StrategyFactoryConfig {
    fn default() -> Self {
        let mut definitions = BTreeMap::new();
        definitions.insert("local".to_string(), StagingDefinition::local());
        for backend in ["snowflake", "redshift", "synapse", "bigquery", "abs"] {
            definitions.insert(
                format!("workspace-{}", backend),
                StagingDefinition::workspace(backend),
            );
        }

        Self {
            definitions,
            project_backends: Vec::new(),
        }
    }
}

impl StrategyFactoryConfig {
    pub fn with_definition(mut self, tag: impl Into<String>, definition: StagingDefinition) -> Self {
        self.definitions.insert(tag.into(), definition);
        self
    }

    pub fn with_project_backends(mut self, backends: Vec<String>) -> Self {
        self.project_backends = backends;
        self
    }

    /// Known staging type tags, sorted
    pub fn supported_tags(&self) -> Vec<String> {
        self.definitions.keys().cloned().collect()
    }

    fn supports_backend(&self, backend: &str) -> bool {
        self.project_backends
            .iter()
            .any(|b| b.eq_ignore_ascii_case(backend))
    }
}

// ============================================================================
// Factory
// ============================================================================

pub struct StrategyFactory {
    config: StrategyFactoryConfig,
    storage: Arc<dyn StorageBackend>,
    local_staging: Arc<dyn StagingArea>,
    workspace: Option<WorkspaceStaging>,
    slicer: Option<Arc<dyn SourceSlicer>>,
}

impl StrategyFactory {
    pub fn new(
        config: StrategyFactoryConfig,
        storage: Arc<dyn StorageBackend>,
        local_staging: Arc<dyn StagingArea>,
    ) -> Self {
        Self {
            config,
            storage,
            local_staging,
            workspace: None,
            slicer: None,
        }
    }

    /// Factory with the standard lookup table and the collaborators of `config`
    pub fn from_core_config(config: &CoreConfig) -> Self {
        let factory_config =
            StrategyFactoryConfig::default().with_project_backends(config.project_backends.clone());

        let factory = Self::new(
            factory_config,
            config.storage_backend.clone(),
            config.local_staging.clone(),
        );

        match &config.workspace_staging {
            Some(workspace) => factory.with_workspace(workspace.clone()),
            None => factory,
        }
    }

    pub fn with_workspace(mut self, workspace: WorkspaceStaging) -> Self {
        self.workspace = Some(workspace);
        self
    }

    pub fn with_slicer(mut self, slicer: Arc<dyn SourceSlicer>) -> Self {
        self.slicer = Some(slicer);
        self
    }

    pub fn config(&self) -> &StrategyFactoryConfig {
        &self.config
    }

    /// Strategy for writing tables through `staging_type`
    ///
    /// # Errors
    ///
    /// - `BackendNotSupported` for an unknown tag
    /// - `ProjectCapabilityMissing` when the project lacks the workspace backend
    /// - `StagingNotConfigured` when no workspace is attached
    #[instrument(skip(self))]
    pub fn get_table_strategy(&self, staging_type: &str) -> Result<TableStrategy> {
        let definition = self.definition(staging_type)?;

        if let Some(backend) = &definition.workspace_backend {
            if !self.config.supports_backend(backend) {
                return Err(SyncError::ProjectCapabilityMissing {
                    backend: backend.clone(),
                });
            }
        }

        let strategy = match definition.mapping_kind {
            MappingKind::Local => {
                let mut resolver = LocalMappingResolver::new(self.local_staging.clone());
                if let Some(slicer) = &self.slicer {
                    resolver = resolver.with_slicer(slicer.clone());
                }
                TableStrategy::Local(LocalTableStrategy {
                    resolver,
                    staging: self.local_staging.clone(),
                    storage: self.storage.clone(),
                })
            }
            MappingKind::Workspace => {
                let workspace = self.workspace(staging_type)?;
                let mut resolver =
                    WorkspaceMappingResolver::new(workspace.workspace_id.clone(), workspace.area.clone());
                if let Some(slicer) = &self.slicer {
                    resolver = resolver.with_slicer(slicer.clone());
                }
                TableStrategy::Workspace(WorkspaceTableStrategy {
                    resolver,
                    staging: workspace.area.clone(),
                })
            }
        };

        debug!(staging_type, "Selected table strategy");
        Ok(strategy)
    }

    /// Strategy for moving files through `staging_type`
    ///
    /// # Errors
    ///
    /// - `BackendNotSupported` for an unknown tag
    /// - `StagingNotConfigured` when no workspace is attached
    #[instrument(skip(self))]
    pub fn get_file_strategy(&self, staging_type: &str) -> Result<FileStrategy> {
        let definition = self.definition(staging_type)?;

        let strategy = match definition.mapping_kind {
            MappingKind::Local => FileStrategy::Local(LocalFileStrategy {
                staging: self.local_staging.clone(),
                storage: self.storage.clone(),
            }),
            MappingKind::Workspace => {
                let workspace = self.workspace(staging_type)?;
                FileStrategy::Workspace(WorkspaceFileStrategy {
                    workspace_id: workspace.workspace_id.clone(),
                    staging: workspace.area.clone(),
                    storage: self.storage.clone(),
                })
            }
        };

        debug!(staging_type, "Selected file strategy");
        Ok(strategy)
    }

    fn definition(&self, staging_type: &str) -> Result<&StagingDefinition> {
        self.config
            .definitions
            .get(staging_type)
            .ok_or_else(|| SyncError::BackendNotSupported {
                requested: staging_type.to_string(),
                supported: self.config.supported_tags(),
            })
    }

    fn workspace(&self, staging_type: &str) -> Result<&WorkspaceStaging> {
        self.workspace
            .as_ref()
            .ok_or_else(|| SyncError::StagingNotConfigured {
                staging: staging_type.to_string(),
            })
    }
}

// ============================================================================
// Table Strategies
// ============================================================================

pub struct LocalTableStrategy {
    resolver: LocalMappingResolver,
    staging: Arc<dyn StagingArea>,
    storage: Arc<dyn StorageBackend>,
}

pub struct WorkspaceTableStrategy {
    resolver: WorkspaceMappingResolver,
    staging: Arc<dyn StagingArea>,
}

/// Table transfer strategy selected by [`StrategyFactory`]
pub enum TableStrategy {
    Local(LocalTableStrategy),
    Workspace(WorkspaceTableStrategy),
}

impl TableStrategy {
    pub fn mapping_kind(&self) -> MappingKind {
        match self {
            TableStrategy::Local(_) => MappingKind::Local,
            TableStrategy::Workspace(_) => MappingKind::Workspace,
        }
    }

    fn staging(&self) -> &dyn StagingArea {
        match self {
            TableStrategy::Local(strategy) => strategy.staging.as_ref(),
            TableStrategy::Workspace(strategy) => strategy.staging.as_ref(),
        }
    }

    /// Resolve mapping sources with the resolver of this staging
    pub async fn resolve_mapping_sources(
        &self,
        path_prefix: &str,
        configurations: &[MappingConfiguration],
        is_failed_job_run: bool,
        use_slicing: bool,
    ) -> Result<ResolvedSources> {
        let resolved = match self {
            TableStrategy::Local(strategy) => {
                strategy
                    .resolver
                    .resolve_mapping_sources(path_prefix, configurations, is_failed_job_run, use_slicing)
                    .await?
            }
            TableStrategy::Workspace(strategy) => {
                strategy
                    .resolver
                    .resolve_mapping_sources(path_prefix, configurations, is_failed_job_run, use_slicing)
                    .await?
            }
        };
        Ok(resolved)
    }

    /// Make the data of `source` readable by a load job
    ///
    /// Local sources are uploaded to file storage from their staged location.
    /// Workspace sources are referenced in place.
    pub async fn prepare_load_source(&self, source: &MappingSource) -> Result<LoadSource> {
        match (self, source.source()) {
            (TableStrategy::Local(strategy), SourceItem::Physical(item)) => {
                let path = Path::new(&item.path_name);
                let file_id = strategy
                    .storage
                    .upload_file(path, &FileUploadOptions::default())
                    .await?;
                debug!(path = %path.display(), file_id = %file_id, "Uploaded table data");
                Ok(LoadSource::File { file_id })
            }
            (TableStrategy::Workspace(_), SourceItem::Workspace(item)) => {
                Ok(LoadSource::Workspace {
                    workspace_id: item.workspace_id.clone(),
                    data_object: item.data_object.clone(),
                })
            }
            (TableStrategy::Workspace(strategy), SourceItem::Physical(item)) => {
                Ok(LoadSource::Workspace {
                    workspace_id: strategy.resolver.workspace_id().to_string(),
                    data_object: item.source_name().to_string(),
                })
            }
            (TableStrategy::Local(_), SourceItem::Workspace(item)) => {
                Err(SyncError::Mapping(MappingError::InvalidMapping(format!(
                    "Workspace source \"{}\" cannot be written through local staging",
                    item.name
                ))))
            }
        }
    }

    /// Configuration entry of `source` with its manifest sidecar applied
    ///
    /// Options from the manifest fill whatever the entry leaves unset.
    pub async fn effective_configuration(
        &self,
        source: &MappingSource,
    ) -> Result<Option<MappingConfiguration>> {
        let Some(manifest) = source.manifest() else {
            return Ok(source.configuration().cloned());
        };

        let fields = self.staging().read_manifest(manifest).await?;
        let configuration = source
            .configuration()
            .cloned()
            .unwrap_or_else(|| MappingConfiguration::new(source.source_name()));
        debug!(manifest = %manifest.path_name, "Applying table manifest");
        Ok(Some(configuration.merge_manifest(&fields)?))
    }

    /// Build the load task writing `source`
    ///
    /// # Errors
    ///
    /// Returns `InvalidMapping` when no destination can be derived for the
    /// source or its manifest is malformed, plus any error of
    /// [`prepare_load_source`](Self::prepare_load_source).
    pub async fn build_load_task(
        &self,
        source: &MappingSource,
        default_bucket: Option<&str>,
    ) -> Result<LoadTask> {
        let source = match self.effective_configuration(source).await? {
            Some(configuration) => source.clone().with_configuration(configuration),
            None => source.clone(),
        };
        let source = &source;

        let table_id = source.destination(default_bucket).ok_or_else(|| {
            MappingError::InvalidMapping(format!(
                "Cannot derive a destination for source \"{}\"",
                source.source_name()
            ))
        })?;

        let load_source = self.prepare_load_source(source).await?;
        let options = match source.configuration() {
            Some(configuration) => configuration.load_options(load_source),
            None => bridge_traits::LoadOptions::new(load_source),
        };

        let task = LoadTask::new(
            LoadDestination::LoadTable {
                table_id: table_id.clone(),
            },
            options,
        );

        let operation = source.configuration().and_then(|configuration| {
            MetadataOperation::from_mapping(table_id, DEFAULT_METADATA_PROVIDER, configuration)
        });

        Ok(match operation {
            Some(operation) => task.with_metadata_operation(operation),
            None => task,
        })
    }
}

// ============================================================================
// File Strategies
// ============================================================================

pub struct LocalFileStrategy {
    staging: Arc<dyn StagingArea>,
    storage: Arc<dyn StorageBackend>,
}

pub struct WorkspaceFileStrategy {
    workspace_id: String,
    staging: Arc<dyn StagingArea>,
    storage: Arc<dyn StorageBackend>,
}

/// File transfer strategy selected by [`StrategyFactory`]
pub enum FileStrategy {
    Local(LocalFileStrategy),
    Workspace(WorkspaceFileStrategy),
}

impl FileStrategy {
    fn staging(&self) -> &dyn StagingArea {
        match self {
            FileStrategy::Local(strategy) => strategy.staging.as_ref(),
            FileStrategy::Workspace(strategy) => strategy.staging.as_ref(),
        }
    }

    /// Workspace the files live in, if any
    pub fn workspace_id(&self) -> Option<&str> {
        match self {
            FileStrategy::Local(_) => None,
            FileStrategy::Workspace(strategy) => Some(&strategy.workspace_id),
        }
    }

    pub async fn list_files(&self, path: &str) -> Result<Vec<PhysicalItem>> {
        Ok(self.staging().list_data_items(path).await?)
    }

    pub async fn list_manifests(&self, path: &str) -> Result<Vec<PhysicalItem>> {
        Ok(self.staging().list_manifest_items(path).await?)
    }

    pub async fn read_file_manifest(&self, item: &PhysicalItem) -> Result<ManifestFields> {
        Ok(self.staging().read_manifest(item).await?)
    }

    /// Upload a staged file and return its file id
    ///
    /// The item's `path_name` is passed through unchanged: a local path as
    /// listed by the staging area, or a path inside the workspace.
    pub async fn load_file_to_storage(
        &self,
        item: &PhysicalItem,
        options: &FileUploadOptions,
    ) -> Result<String> {
        let storage = match self {
            FileStrategy::Local(strategy) => &strategy.storage,
            FileStrategy::Workspace(strategy) => &strategy.storage,
        };

        let file_id = storage.upload_file(Path::new(&item.path_name), options).await?;
        debug!(file = %item.path_name, file_id = %file_id, "Uploaded file");
        Ok(file_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockStaging, MockStorage};
    use bridge_traits::MetadataEntry;
    use core_mapping::WorkspaceItem;

    fn factory(project_backends: &[&str]) -> StrategyFactory {
        let config = StrategyFactoryConfig::default()
            .with_project_backends(project_backends.iter().map(|b| b.to_string()).collect());
        StrategyFactory::new(
            config,
            Arc::new(MockStorage::new()),
            Arc::new(MockStaging::new()),
        )
    }

    fn workspace(area: MockStaging) -> WorkspaceStaging {
        WorkspaceStaging {
            workspace_id: "ws-123".to_string(),
            area: Arc::new(area),
        }
    }

    #[test]
    fn test_default_tags() {
        assert_eq!(
            StrategyFactoryConfig::default().supported_tags(),
            vec![
                "local",
                "workspace-abs",
                "workspace-bigquery",
                "workspace-redshift",
                "workspace-snowflake",
                "workspace-synapse"
            ]
        );
    }

    #[test]
    fn test_unknown_tag() {
        let factory = factory(&[]);

        for result in [
            factory.get_table_strategy("s3").map(|_| ()),
            factory.get_file_strategy("s3").map(|_| ()),
        ] {
            match result {
                Err(SyncError::BackendNotSupported {
                    requested,
                    supported,
                }) => {
                    assert_eq!(requested, "s3");
                    assert_eq!(supported.len(), 6);
                }
                _ => panic!("expected BackendNotSupported"),
            }
        }
    }

    #[test]
    fn test_table_strategy_requires_project_backend() {
        let factory = factory(&["redshift"]).with_workspace(workspace(MockStaging::new()));

        let err = factory
            .get_table_strategy("workspace-snowflake")
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.to_string(), "Project does not support \"snowflake\" backend.");

        let strategy = factory.get_table_strategy("workspace-redshift").unwrap();
        assert_eq!(strategy.mapping_kind(), MappingKind::Workspace);
    }

    #[test]
    fn test_file_strategy_skips_project_check() {
        let factory = factory(&[]).with_workspace(workspace(MockStaging::new()));

        let strategy = factory.get_file_strategy("workspace-abs").unwrap();
        assert_eq!(strategy.workspace_id(), Some("ws-123"));
    }

    #[test]
    fn test_workspace_without_attached_workspace() {
        let factory = factory(&["snowflake"]);

        let err = factory
            .get_table_strategy("workspace-snowflake")
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, SyncError::StagingNotConfigured { ref staging } if staging == "workspace-snowflake"));
    }

    #[test]
    fn test_injected_definition() {
        let config = StrategyFactoryConfig::default()
            .with_definition("s3", StagingDefinition::local());
        let factory = StrategyFactory::new(
            config,
            Arc::new(MockStorage::new()),
            Arc::new(MockStaging::new()),
        );

        let strategy = factory.get_table_strategy("s3").unwrap();
        assert_eq!(strategy.mapping_kind(), MappingKind::Local);
    }

    #[tokio::test]
    async fn test_local_task_uploads_source() {
        let mut storage = MockStorage::new();
        storage
            .expect_upload_file()
            .withf(|path, _| path == Path::new("out/tables/orders.csv"))
            .times(1)
            .returning(|_, _| Ok("file-1".to_string()));

        let factory = StrategyFactory::new(
            StrategyFactoryConfig::default(),
            Arc::new(storage),
            Arc::new(MockStaging::new()),
        );
        let strategy = factory.get_table_strategy("local").unwrap();

        let mut mapping = MappingConfiguration::new("orders.csv").with_destination("out.c-main.orders");
        mapping.incremental = true;
        mapping.metadata = vec![MetadataEntry::new("owner", "sales")];
        let source = MappingSource::new(SourceItem::Physical(PhysicalItem::new(
            "orders.csv",
            "out/tables",
        )))
        .with_configuration(mapping);

        let task = strategy.build_load_task(&source, None).await.unwrap();

        assert_eq!(task.table_id(), "out.c-main.orders");
        assert_eq!(
            task.options.source,
            LoadSource::File {
                file_id: "file-1".to_string()
            }
        );
        assert!(task.options.incremental);
        assert_eq!(task.metadata_operations.len(), 1);
        assert_eq!(task.metadata_operations[0].provider, DEFAULT_METADATA_PROVIDER);
    }

    #[tokio::test]
    async fn test_task_applies_manifest_under_configuration() {
        let mut staging = MockStaging::new();
        staging
            .expect_read_manifest()
            .withf(|item| item.path_name == "out/tables/orders.csv.manifest")
            .times(1)
            .returning(|_| {
                let mut fields = ManifestFields::new();
                fields.insert("destination".to_string(), serde_json::json!("out.c-main.from_manifest"));
                fields.insert("incremental".to_string(), serde_json::json!(true));
                fields.insert("primary_key".to_string(), serde_json::json!(["id"]));
                Ok(fields)
            });
        let mut storage = MockStorage::new();
        storage
            .expect_upload_file()
            .returning(|_, _| Ok("file-1".to_string()));

        let factory = StrategyFactory::new(
            StrategyFactoryConfig::default(),
            Arc::new(storage),
            Arc::new(staging),
        );
        let strategy = factory.get_table_strategy("local").unwrap();

        let source = MappingSource::new(SourceItem::Physical(PhysicalItem::new(
            "orders.csv",
            "out/tables",
        )))
        .with_manifest(PhysicalItem::new("orders.csv.manifest", "out/tables"))
        .with_configuration(
            MappingConfiguration::new("orders.csv").with_destination("out.c-main.orders"),
        );

        let task = strategy.build_load_task(&source, None).await.unwrap();

        assert_eq!(task.table_id(), "out.c-main.orders");
        assert!(task.options.incremental);
        assert_eq!(task.options.primary_key, vec!["id".to_string()]);
    }

    #[tokio::test]
    async fn test_manifest_alone_names_destination() {
        let mut area = MockStaging::new();
        area.expect_read_manifest().times(1).returning(|_| {
            let mut fields = ManifestFields::new();
            fields.insert("destination".to_string(), serde_json::json!("out.c-main.events"));
            Ok(fields)
        });
        let factory = factory(&["snowflake"]).with_workspace(workspace(area));
        let strategy = factory.get_table_strategy("workspace-snowflake").unwrap();

        let source = MappingSource::new(SourceItem::Workspace(WorkspaceItem::new(
            "events", "ws-123",
        )))
        .with_manifest(PhysicalItem::new("events.manifest", ""));

        let task = strategy.build_load_task(&source, None).await.unwrap();
        assert_eq!(task.table_id(), "out.c-main.events");
    }

    #[tokio::test]
    async fn test_workspace_task_references_data_object() {
        let factory = factory(&["snowflake"]).with_workspace(workspace(MockStaging::new()));
        let strategy = factory.get_table_strategy("workspace-snowflake").unwrap();

        let source = MappingSource::new(SourceItem::Workspace(WorkspaceItem::new(
            "orders", "ws-123",
        )));

        let task = strategy
            .build_load_task(&source, Some("out.c-main"))
            .await
            .unwrap();

        assert_eq!(task.table_id(), "out.c-main.orders");
        assert_eq!(
            task.options.source,
            LoadSource::Workspace {
                workspace_id: "ws-123".to_string(),
                data_object: "orders".to_string()
            }
        );
        assert!(task.metadata_operations.is_empty());
    }

    #[tokio::test]
    async fn test_task_without_destination() {
        let factory = factory(&["snowflake"]).with_workspace(workspace(MockStaging::new()));
        let strategy = factory.get_table_strategy("workspace-snowflake").unwrap();
        let source = MappingSource::new(SourceItem::Workspace(WorkspaceItem::new(
            "orders", "ws-123",
        )));

        let err = strategy.build_load_task(&source, None).await.unwrap_err();
        assert!(matches!(err, SyncError::Mapping(MappingError::InvalidMapping(_))));
    }

    #[tokio::test]
    async fn test_file_strategy_delegates_to_staging() {
        let mut area = MockStaging::new();
        area.expect_list_data_items()
            .withf(|path| path == "in/files")
            .returning(|path| Ok(vec![PhysicalItem::new("report.pdf", path)]));
        area.expect_list_manifest_items()
            .returning(|path| Ok(vec![PhysicalItem::new("report.pdf.manifest", path)]));
        area.expect_read_manifest().returning(|_| {
            let mut fields = ManifestFields::new();
            fields.insert("tags".to_string(), serde_json::json!(["invoice"]));
            Ok(fields)
        });

        let mut storage = MockStorage::new();
        storage
            .expect_upload_file()
            .withf(|path, options| path == Path::new("in/files/report.pdf") && options.is_permanent)
            .returning(|_, _| Ok("file-9".to_string()));

        let factory = StrategyFactory::new(
            StrategyFactoryConfig::default(),
            Arc::new(storage),
            Arc::new(MockStaging::new()),
        )
        .with_workspace(workspace(area));
        let strategy = factory.get_file_strategy("workspace-abs").unwrap();

        let files = strategy.list_files("in/files").await.unwrap();
        assert_eq!(files.len(), 1);
        let manifests = strategy.list_manifests("in/files").await.unwrap();
        let fields = strategy.read_file_manifest(&manifests[0]).await.unwrap();
        assert_eq!(fields["tags"], serde_json::json!(["invoice"]));

        let options = FileUploadOptions {
            is_permanent: true,
            ..FileUploadOptions::default()
        };
        let file_id = strategy.load_file_to_storage(&files[0], &options).await.unwrap();
        assert_eq!(file_id, "file-9");
    }
}
