//! # Core Mapping
//!
//! Decides which data sources a job moves and how.
//!
//! ## Overview
//!
//! A job leaves data items (files, directories or workspace objects) and
//! optional `.manifest` sidecars in a staging area. Its configuration declares
//! output mapping entries naming some of those items. This crate reconciles
//! the three into [`MappingSource`] values:
//!
//! - [`LocalMappingResolver`] - sources discovered by enumerating a local
//!   staging directory
//! - [`WorkspaceMappingResolver`] - sources synthesized from declared names
//!   and manifest evidence inside a workspace
//! - [`MappingCombiner`] - lenient pairwise join used when validation happens
//!   elsewhere
//!
//! On the input side, [`TableResolver`] turns metadata search criteria into
//! concrete table ids.
//!
//! ## Failure rules
//!
//! An orphaned manifest is always fatal. A configured source without data is
//! fatal unless the job run being processed had failed, in which case the
//! names are reported in [`ResolvedSources::skipped_missing`].

pub mod combiner;
pub mod configuration;
pub mod error;
pub mod input;
pub mod local_resolver;
pub mod resolution;
pub mod source;
pub mod table_resolver;
pub mod workspace_resolver;

pub use combiner::{CombinedItem, MappingCombiner};
pub use configuration::MappingConfiguration;
pub use error::{MappingError, Result};
pub use input::{InputTableMapping, SourceSearch};
pub use local_resolver::LocalMappingResolver;
pub use resolution::{ResolvedSources, SourceSlicer};
pub use source::{MappingSource, SourceItem, WorkspaceItem};
pub use table_resolver::TableResolver;
pub use workspace_resolver::WorkspaceMappingResolver;
