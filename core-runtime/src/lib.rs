//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for job workers:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the mapping and orchestration
//! crates depend on. It establishes the logging conventions and the fail-fast
//! configuration contract used throughout the workspace.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, WorkspaceStaging};
pub use error::{Error, Result};
