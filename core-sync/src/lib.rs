//! # Core Sync
//!
//! Incremental state and deferred load orchestration.
//!
//! ## Overview
//!
//! - [`state`] - read-only registry of the markers a previous run recorded
//! - [`staging`] - staging type lookup and the table/file strategies it
//!   selects
//! - [`load_task`] / [`load_queue`] - submit every table write of a job, then
//!   wait for all of them and report every failure at once
//!
//! ## Typical write phase
//!
//! ```ignore
//! let factory = StrategyFactory::from_core_config(&config);
//! let strategy = factory.get_table_strategy("local")?;
//! let resolved = strategy
//!     .resolve_mapping_sources("out/tables", &mappings, false, false)
//!     .await?;
//!
//! let mut queue = LoadQueue::from_core_config(&config);
//! for source in &resolved.sources {
//!     let task = strategy
//!         .build_load_task(source, config.default_bucket.as_deref())
//!         .await?;
//!     queue.add_task(task);
//! }
//! queue.start().await?;
//! let job_ids = queue.wait_for_all().await?;
//! ```

pub mod error;
pub mod load_queue;
pub mod load_task;
pub mod staging;
pub mod state;

pub use error::{Result, SyncError};
pub use load_queue::LoadQueue;
pub use load_task::{
    LoadTask, LoadTaskId, LoadTaskStatus, MetadataOperation, DEFAULT_METADATA_PROVIDER,
};
pub use staging::{
    FileStrategy, MappingKind, StagingDefinition, StrategyFactory, StrategyFactoryConfig,
    TableStrategy,
};
pub use state::{
    FileTag, InputFileState, InputFileStateList, InputTableState, InputTableStateList,
    StateNotFound, ADAPTIVE_CHANGED_SINCE,
};

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use bridge_traits::error::Result;
    use bridge_traits::{
        ColumnMetadata, FileUploadOptions, JobOutcome, LoadDestination, LoadOptions,
        ManifestFields, MetadataEntry, PhysicalItem, SearchCandidate, StagingArea, StorageBackend,
    };
    use mockall::mock;
    use std::path::Path;

    mock! {
        pub Storage {}

        #[async_trait]
        impl StorageBackend for Storage {
            async fn search_by_metadata(&self, key: &str, value: &str) -> Result<Vec<SearchCandidate>>;
            async fn submit_table_create_or_load(
                &self,
                destination: &LoadDestination,
                options: &LoadOptions,
            ) -> Result<String>;
            async fn wait_for_job(&self, job_id: &str) -> Result<JobOutcome>;
            async fn apply_metadata(
                &self,
                table_id: &str,
                provider: &str,
                table_metadata: &[MetadataEntry],
                column_metadata: &[ColumnMetadata],
            ) -> Result<()>;
            async fn upload_file(&self, path: &Path, options: &FileUploadOptions) -> Result<String>;
        }
    }

    mock! {
        pub Staging {}

        #[async_trait]
        impl StagingArea for Staging {
            async fn list_data_items(&self, path: &str) -> Result<Vec<PhysicalItem>>;
            async fn list_manifest_items(&self, path: &str) -> Result<Vec<PhysicalItem>>;
            async fn read_manifest(&self, item: &PhysicalItem) -> Result<ManifestFields>;
        }
    }
}
