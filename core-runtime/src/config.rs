//! # Core Configuration Module
//!
//! Provides configuration management for job workers.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the collaborators and settings the mapping and load
//! orchestration layers need. It enforces fail-fast validation so a worker
//! never starts a job with a missing storage backend or staging area.
//!
//! ## Required Dependencies
//!
//! - `StorageBackend` - Required for searches, load jobs and metadata
//! - `data_dir` - Root of the local staging area
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - Local `StagingArea` (desktop default: `LocalStagingArea` over `data_dir`)
//! - Workspace `StagingArea` (required only for workspace staging types)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .storage_backend(Arc::new(MyStorageClient::new()))
//!     .data_dir("/data")
//!     .job_wait_timeout(Duration::from_secs(900))
//!     .project_backend("snowflake")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{StagingArea, StorageBackend};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default timeout for waiting on a single storage job
pub const DEFAULT_JOB_WAIT_TIMEOUT: Duration = Duration::from_secs(3600);

/// A workspace the job reads from or writes to
#[derive(Clone)]
pub struct WorkspaceStaging {
    /// Storage identifier of the workspace
    pub workspace_id: String,
    /// Enumeration access to the workspace
    pub area: Arc<dyn StagingArea>,
}

impl WorkspaceStaging {
    pub fn new(workspace_id: impl Into<String>, area: Arc<dyn StagingArea>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            area,
        }
    }
}

impl std::fmt::Debug for WorkspaceStaging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceStaging")
            .field("workspace_id", &self.workspace_id)
            .field("area", &"StagingArea { ... }")
            .finish()
    }
}

/// Core configuration for a job worker.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Storage service client (required)
    pub storage_backend: Arc<dyn StorageBackend>,

    /// Local staging area (desktop default: `LocalStagingArea` over `data_dir`)
    pub local_staging: Arc<dyn StagingArea>,

    /// Workspace staging, when the job has a workspace attached
    pub workspace_staging: Option<WorkspaceStaging>,

    /// Root of the local data directory
    pub data_dir: PathBuf,

    /// Upper bound for waiting on one storage job
    pub job_wait_timeout: Duration,

    /// Workspace backends the project is entitled to (`snowflake`, `bigquery`, ...)
    pub project_backends: Vec<String>,

    /// Bucket used for sources that have no configured destination
    pub default_bucket: Option<String>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("storage_backend", &"StorageBackend { ... }")
            .field("local_staging", &"StagingArea { ... }")
            .field("workspace_staging", &self.workspace_staging)
            .field("data_dir", &self.data_dir)
            .field("job_wait_timeout", &self.job_wait_timeout)
            .field("project_backends", &self.project_backends)
            .field("default_bucket", &self.default_bucket)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Data directory is not empty
    /// - Job wait timeout is greater than zero
    /// - Workspace id is not empty when a workspace is attached
    /// - Default bucket, when set, is not blank
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::Config("Data directory cannot be empty".to_string()));
        }

        if self.job_wait_timeout.is_zero() {
            return Err(Error::Config(
                "Job wait timeout must be greater than 0 seconds".to_string(),
            ));
        }

        if let Some(workspace) = &self.workspace_staging {
            if workspace.workspace_id.trim().is_empty() {
                return Err(Error::Config(
                    "Workspace staging requires a non-empty workspace id".to_string(),
                ));
            }
        }

        if let Some(bucket) = &self.default_bucket {
            if bucket.trim().is_empty() {
                return Err(Error::Config(
                    "Default bucket cannot be blank; omit it instead".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Whether the project declares the given workspace backend
    pub fn supports_backend(&self, backend: &str) -> bool {
        self.project_backends
            .iter()
            .any(|b| b.eq_ignore_ascii_case(backend))
    }
}

fn storage_backend_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "StorageBackend".to_string(),
        message: "A StorageBackend implementation is required to search tables, submit load jobs \
                  and apply metadata. Inject the storage service client with .storage_backend()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_local_staging(data_dir: &Path) -> Result<Arc<dyn StagingArea>> {
    use bridge_desktop::LocalStagingArea;

    let staging: Arc<dyn StagingArea> = Arc::new(LocalStagingArea::new(data_dir));
    Ok(staging)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_local_staging(_data_dir: &Path) -> Result<Arc<dyn StagingArea>> {
    Err(Error::CapabilityMissing {
        capability: "StagingArea".to_string(),
        message: "A local StagingArea is required to enumerate data items and manifests. \
                  Enable the 'desktop-shims' feature to use LocalStagingArea, or inject one \
                  with .local_staging()."
            .to_string(),
    })
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    storage_backend: Option<Arc<dyn StorageBackend>>,
    local_staging: Option<Arc<dyn StagingArea>>,
    workspace_staging: Option<WorkspaceStaging>,
    data_dir: Option<PathBuf>,
    job_wait_timeout: Option<Duration>,
    project_backends: Vec<String>,
    default_bucket: Option<String>,
}

impl CoreConfigBuilder {
    /// Sets the storage service client.
    pub fn storage_backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.storage_backend = Some(backend);
        self
    }

    /// Sets a custom local staging area.
    pub fn local_staging(mut self, staging: Arc<dyn StagingArea>) -> Self {
        self.local_staging = Some(staging);
        self
    }

    /// Attaches a workspace.
    pub fn workspace_staging(mut self, staging: WorkspaceStaging) -> Self {
        self.workspace_staging = Some(staging);
        self
    }

    /// Sets the local data directory.
    pub fn data_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the timeout for waiting on one storage job.
    pub fn job_wait_timeout(mut self, timeout: Duration) -> Self {
        self.job_wait_timeout = Some(timeout);
        self
    }

    /// Declares a workspace backend available to the project.
    pub fn project_backend(mut self, backend: impl Into<String>) -> Self {
        self.project_backends.push(backend.into());
        self
    }

    /// Sets the bucket for sources without a configured destination.
    pub fn default_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.default_bucket = Some(bucket.into());
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - The storage backend is missing
    /// - The data directory is missing
    /// - No local staging area is available
    /// - Configuration values are invalid
    pub fn build(self) -> Result<CoreConfig> {
        let storage_backend = self
            .storage_backend
            .ok_or_else(storage_backend_missing_error)?;

        let data_dir = self.data_dir.ok_or_else(|| {
            Error::Config("Data directory is required. Use .data_dir() to set it.".to_string())
        })?;

        let local_staging = match self.local_staging {
            Some(staging) => staging,
            None => provide_default_local_staging(&data_dir)?,
        };

        let config = CoreConfig {
            storage_backend,
            local_staging,
            workspace_staging: self.workspace_staging,
            data_dir,
            job_wait_timeout: self.job_wait_timeout.unwrap_or(DEFAULT_JOB_WAIT_TIMEOUT),
            project_backends: self.project_backends,
            default_bucket: self.default_bucket,
        };

        config.validate()?;

        Ok(config)
    }
}
