//! # State Registry
//!
//! Read-only view over the synchronization markers a previous job run left
//! behind. Tables are keyed by source id, files by their tag set.
//!
//! A lookup miss is [`StateNotFound`]: absence of prior state is normal on a
//! first run, so callers decide whether it matters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Value of `changed_since` that defers to the stored import date
pub const ADAPTIVE_CHANGED_SINCE: &str = "adaptive";

/// No state is recorded for the requested table or tag set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateNotFound {
    #[error("State for table \"{0}\" not found.")]
    Table(String),

    #[error("State for file with tags: \"{}\" not found.", .0.join("\", \""))]
    File(Vec<String>),
}

// ============================================================================
// Tables
// ============================================================================

/// Last import marker of one input table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputTableState {
    pub source: String,
    pub last_import_date: String,
}

impl InputTableState {
    pub fn new(source: impl Into<String>, last_import_date: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            last_import_date: last_import_date.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputTableStateList {
    tables: Vec<InputTableState>,
}

impl InputTableStateList {
    pub fn new(tables: Vec<InputTableState>) -> Self {
        Self { tables }
    }

    /// Look up the state recorded for `source` (exact match)
    pub fn get_table(&self, source: &str) -> Result<&InputTableState, StateNotFound> {
        self.tables
            .iter()
            .find(|t| t.source == source)
            .ok_or_else(|| StateNotFound::Table(source.to_string()))
    }

    /// Records in the order they were provided
    pub fn to_array(&self) -> Vec<InputTableState> {
        self.tables.clone()
    }

    /// Effective lower bound of an incremental read of `source`
    ///
    /// `"adaptive"` resolves to the last import date, or `None` on a first
    /// run. Any other value is returned unchanged.
    pub fn resolve_changed_since(&self, source: &str, changed_since: Option<&str>) -> Option<String> {
        match changed_since {
            Some(ADAPTIVE_CHANGED_SINCE) => self
                .get_table(source)
                .ok()
                .map(|state| state.last_import_date.clone()),
            other => other.map(str::to_string),
        }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

// ============================================================================
// Files
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTag {
    pub name: String,
}

/// Last import marker of the files selected by one tag set
///
/// Tags keep the order they were recorded in; matching ignores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFileState {
    pub tags: Vec<FileTag>,
    pub last_import_id: String,
}

impl InputFileState {
    pub fn new<I, S>(tags: I, last_import_id: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags
                .into_iter()
                .map(|name| FileTag { name: name.into() })
                .collect(),
            last_import_id: last_import_id.into(),
        }
    }

    fn tag_set(&self) -> BTreeSet<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputFileStateList {
    files: Vec<InputFileState>,
}

impl InputFileStateList {
    pub fn new(files: Vec<InputFileState>) -> Self {
        Self { files }
    }

    /// Look up the state recorded for exactly this tag set
    pub fn get_file<S: AsRef<str>>(&self, tags: &[S]) -> Result<&InputFileState, StateNotFound> {
        let wanted: BTreeSet<&str> = tags.iter().map(AsRef::as_ref).collect();

        self.files
            .iter()
            .find(|f| f.tag_set() == wanted)
            .ok_or_else(|| StateNotFound::File(wanted.iter().map(|t| t.to_string()).collect()))
    }

    pub fn to_array(&self) -> Vec<InputFileState> {
        self.files.clone()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
