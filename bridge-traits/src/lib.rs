//! # Bridge Traits
//!
//! Contracts between the mapping/orchestration core and its external
//! collaborators.
//!
//! ## Overview
//!
//! The core resolves which data sources a job moves and schedules the storage
//! jobs that move them. Everything that touches the network, the filesystem or
//! a host logging pipeline sits behind one of the traits below, so the core can
//! be exercised against in-memory doubles.
//!
//! ## Traits
//!
//! - [`StorageBackend`](storage::StorageBackend) - Metadata search, load job submission and polling,
//!   metadata application, file upload
//! - [`StagingArea`](staging::StagingArea) - Enumerate data items and manifests, read manifests
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to the host
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert transport-specific failures into it and keep the message
//! actionable (include the path, table id or job id involved).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared as
//! `Arc<dyn Trait>` across async tasks.

pub mod error;
pub mod log;
pub mod staging;
pub mod storage;

pub use error::BridgeError;

pub use log::{LogEntry, LogLevel, LoggerSink};
pub use staging::{ManifestFields, PhysicalItem, StagingArea, MANIFEST_SUFFIX};
pub use storage::{
    ColumnMetadata, DeleteWhere, DeleteWhereOperator, FileUploadOptions, JobOutcome, JobStatus,
    LoadDestination, LoadOptions, LoadSource, MetadataEntry, SearchCandidate, StorageBackend,
};
