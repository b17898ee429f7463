//! Storage Backend Abstractions
//!
//! The storage service that owns tables, files and load jobs. The core never
//! talks to the service directly; it submits jobs and polls their outcome
//! through [`StorageBackend`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// An object returned by a metadata search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    /// Storage identifier (table id)
    pub id: String,
    /// Display name, when the backend provides one
    #[serde(default)]
    pub name: Option<String>,
}

impl SearchCandidate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// Where a load job writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadDestination {
    /// Create a new table inside a bucket
    CreateTable { bucket_id: String, name: String },
    /// Load into an existing table
    LoadTable { table_id: String },
}

impl LoadDestination {
    /// Fully qualified id of the table the job ends up writing
    pub fn table_id(&self) -> String {
        match self {
            LoadDestination::CreateTable { bucket_id, name } => format!("{}.{}", bucket_id, name),
            LoadDestination::LoadTable { table_id } => table_id.clone(),
        }
    }
}

/// Where the storage service reads the data of a load job from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoadSource {
    /// A file previously uploaded to file storage
    File { file_id: String },
    /// An object living in a workspace
    Workspace {
        workspace_id: String,
        data_object: String,
    },
}

/// Comparison used by a delete-where clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeleteWhereOperator {
    #[default]
    Eq,
    Ne,
}

/// Rows to delete before an incremental load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteWhere {
    pub column: String,
    #[serde(default)]
    pub operator: DeleteWhereOperator,
    pub values: Vec<String>,
}

/// Backend-agnostic options of a table create-or-load job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    pub source: LoadSource,
    #[serde(default)]
    pub incremental: bool,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub delete_where: Option<DeleteWhere>,
}

impl LoadOptions {
    pub fn new(source: LoadSource) -> Self {
        Self {
            source,
            incremental: false,
            primary_key: Vec::new(),
            columns: Vec::new(),
            delete_where: None,
        }
    }

    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    pub fn with_primary_key(mut self, primary_key: Vec<String>) -> Self {
        self.primary_key = primary_key;
        self
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_delete_where(mut self, delete_where: DeleteWhere) -> Self {
        self.delete_where = Some(delete_where);
        self
    }
}

/// One key/value metadata record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}

impl MetadataEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Metadata records attached to a single column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub column: String,
    pub metadata: Vec<MetadataEntry>,
}

/// Terminal status of a storage job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Error,
}

/// Result of waiting for a storage job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl JobOutcome {
    pub fn success(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Success,
            error_message: None,
        }
    }

    pub fn error(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Error,
            error_message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }
}

/// Options for uploading a file to file storage
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileUploadOptions {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_permanent: bool,
    #[serde(default)]
    pub notify: bool,
}

/// Storage backend trait
///
/// Implemented by the storage service client. Every method is a network call;
/// callers await them one at a time.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::{LoadDestination, LoadOptions, LoadSource, StorageBackend};
///
/// async fn load(backend: &dyn StorageBackend) -> Result<()> {
///     let destination = LoadDestination::LoadTable { table_id: "out.c-main.orders".into() };
///     let options = LoadOptions::new(LoadSource::File { file_id: "123".into() });
///     let job_id = backend.submit_table_create_or_load(&destination, &options).await?;
///     let outcome = backend.wait_for_job(&job_id).await?;
///     assert!(outcome.is_success());
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Find objects carrying the metadata pair `key = value`
    async fn search_by_metadata(&self, key: &str, value: &str) -> Result<Vec<SearchCandidate>>;

    /// Submit an asynchronous create-or-load job and return its job id
    ///
    /// Returns as soon as the job is accepted; it does not wait for completion.
    async fn submit_table_create_or_load(
        &self,
        destination: &LoadDestination,
        options: &LoadOptions,
    ) -> Result<String>;

    /// Block until the job reaches a terminal status
    async fn wait_for_job(&self, job_id: &str) -> Result<JobOutcome>;

    /// Attach table and column metadata under the given provider
    async fn apply_metadata(
        &self,
        table_id: &str,
        provider: &str,
        table_metadata: &[MetadataEntry],
        column_metadata: &[ColumnMetadata],
    ) -> Result<()>;

    /// Upload a local file to file storage and return the file id
    async fn upload_file(&self, path: &Path, options: &FileUploadOptions) -> Result<String>;
}
