//! # Load Task
//!
//! One deferred table write: destination, load options and the metadata to
//! apply once the storage job succeeds.
//!
//! ## State Machine
//!
//! ```text
//! Pending → Submitted → Completed
//!               ↓
//!             Failed
//! ```
//!
//! Terminal states are final. A task is never resubmitted.

use bridge_traits::{
    ColumnMetadata, JobOutcome, LoadDestination, LoadOptions, MetadataEntry, StorageBackend,
};
use core_mapping::MappingConfiguration;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{Result, SyncError};

/// Metadata provider used for metadata declared in output mappings
pub const DEFAULT_METADATA_PROVIDER: &str = "user";

// ============================================================================
// ID Types
// ============================================================================

/// Client-side identifier of a load task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadTaskId(Uuid);

impl LoadTaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LoadTaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LoadTaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadTaskStatus {
    /// Built, not yet handed to the storage backend
    Pending,
    /// Job accepted by the backend, outcome unknown
    Submitted,
    /// Job finished successfully
    Completed,
    /// Job finished with an error
    Failed,
}

impl LoadTaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadTaskStatus::Completed | LoadTaskStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadTaskStatus::Pending => "pending",
            LoadTaskStatus::Submitted => "submitted",
            LoadTaskStatus::Completed => "completed",
            LoadTaskStatus::Failed => "failed",
        }
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Table and column metadata written after a successful load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataOperation {
    pub table_id: String,
    pub provider: String,
    pub table_metadata: Vec<MetadataEntry>,
    pub column_metadata: Vec<ColumnMetadata>,
}

impl MetadataOperation {
    /// Metadata declared by an output mapping, or `None` if it declares none
    pub fn from_mapping(
        table_id: impl Into<String>,
        provider: impl Into<String>,
        mapping: &MappingConfiguration,
    ) -> Option<Self> {
        if mapping.metadata.is_empty() && mapping.column_metadata.is_empty() {
            return None;
        }

        Some(Self {
            table_id: table_id.into(),
            provider: provider.into(),
            table_metadata: mapping.metadata.clone(),
            column_metadata: mapping
                .column_metadata
                .iter()
                .map(|(column, metadata)| ColumnMetadata {
                    column: column.clone(),
                    metadata: metadata.clone(),
                })
                .collect(),
        })
    }
}

// ============================================================================
// Load Task
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadTask {
    pub id: LoadTaskId,
    pub destination: LoadDestination,
    pub options: LoadOptions,
    /// Storage job id, assigned on submission
    pub job_id: Option<String>,
    pub status: LoadTaskStatus,
    pub metadata_operations: Vec<MetadataOperation>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub submitted_at: Option<i64>,
    pub completed_at: Option<i64>,
}

impl LoadTask {
    pub fn new(destination: LoadDestination, options: LoadOptions) -> Self {
        Self {
            id: LoadTaskId::new(),
            destination,
            options,
            job_id: None,
            status: LoadTaskStatus::Pending,
            metadata_operations: Vec::new(),
            error_message: None,
            created_at: chrono::Utc::now().timestamp(),
            submitted_at: None,
            completed_at: None,
        }
    }

    pub fn with_metadata_operation(mut self, operation: MetadataOperation) -> Self {
        self.metadata_operations.push(operation);
        self
    }

    /// Id of the table this task writes
    pub fn table_id(&self) -> String {
        self.destination.table_id()
    }

    /// Submit the create-or-load job and record its job id
    ///
    /// # Errors
    ///
    /// Returns an error if the task was already submitted, or if the backend
    /// rejects the submission (the task then stays `Pending`).
    pub async fn start_import(&mut self, storage: &dyn StorageBackend) -> Result<String> {
        self.validate_transition(LoadTaskStatus::Submitted)?;

        let job_id = storage
            .submit_table_create_or_load(&self.destination, &self.options)
            .await?;

        self.job_id = Some(job_id.clone());
        self.status = LoadTaskStatus::Submitted;
        self.submitted_at = Some(chrono::Utc::now().timestamp());
        Ok(job_id)
    }

    /// Record the outcome of the submitted job
    ///
    /// # Errors
    ///
    /// Returns an error if the task is not `Submitted`
    pub fn complete(&mut self, outcome: &JobOutcome) -> Result<()> {
        let to = if outcome.is_success() {
            LoadTaskStatus::Completed
        } else {
            LoadTaskStatus::Failed
        };
        self.validate_transition(to)?;

        self.status = to;
        self.completed_at = Some(chrono::Utc::now().timestamp());
        if !outcome.is_success() {
            self.error_message = Some(
                outcome
                    .error_message
                    .clone()
                    .unwrap_or_else(|| format!("Job {} failed", outcome.job_id)),
            );
        }
        Ok(())
    }

    /// Run the attached metadata operations in order
    ///
    /// # Errors
    ///
    /// Returns an error if the job has not completed successfully
    pub async fn apply_metadata(&self, storage: &dyn StorageBackend) -> Result<()> {
        if self.status != LoadTaskStatus::Completed {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: "apply_metadata".to_string(),
                reason: "Metadata can only be applied after a successful load".to_string(),
            });
        }

        for operation in &self.metadata_operations {
            debug!(table_id = %operation.table_id, provider = %operation.provider, "Applying metadata");
            storage
                .apply_metadata(
                    &operation.table_id,
                    &operation.provider,
                    &operation.table_metadata,
                    &operation.column_metadata,
                )
                .await?;
        }
        Ok(())
    }

    fn validate_transition(&self, to: LoadTaskStatus) -> Result<()> {
        let valid = matches!(
            (self.status, to),
            (LoadTaskStatus::Pending, LoadTaskStatus::Submitted)
                | (LoadTaskStatus::Submitted, LoadTaskStatus::Completed)
                | (LoadTaskStatus::Submitted, LoadTaskStatus::Failed)
        );

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.status.as_str(),
                    to.as_str()
                ),
            });
        }

        Ok(())
    }
}
