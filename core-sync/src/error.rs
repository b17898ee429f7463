use bridge_traits::BridgeError;
use core_mapping::MappingError;
use std::time::Duration;
use thiserror::Error;

use crate::state::StateNotFound;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(
        "Staging backend \"{requested}\" is not supported, supported backends: {}",
        .supported.join(", ")
    )]
    BackendNotSupported {
        requested: String,
        supported: Vec<String>,
    },

    #[error("Project does not support \"{backend}\" backend.")]
    ProjectCapabilityMissing { backend: String },

    #[error("Staging \"{staging}\" is known but not configured")]
    StagingNotConfigured { staging: String },

    #[error("{}", .failures.join(" "))]
    LoadJobFailed { failures: Vec<String> },

    /// Some jobs outlived the wait timeout; failures of the jobs that did
    /// finish are carried along
    #[error("{}", timeout_message(.job_ids, .timeout, .failures))]
    JobTimeout {
        job_ids: Vec<String>,
        timeout: Duration,
        failures: Vec<String>,
    },

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error(transparent)]
    StateNotFound(#[from] StateNotFound),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

fn timeout_message(job_ids: &[String], timeout: &Duration, failures: &[String]) -> String {
    let mut message = format!(
        "Jobs {} did not finish within {:?}",
        job_ids
            .iter()
            .map(|id| format!("\"{}\"", id))
            .collect::<Vec<_>>()
            .join(", "),
        timeout
    );
    for failure in failures {
        message.push(' ');
        message.push_str(failure);
    }
    message
}

pub type Result<T> = std::result::Result<T, SyncError>;
