//! # Load Queue
//!
//! Submits every load task of one write phase, then waits for all of them.
//!
//! Submission and waiting are both sequential and follow the order tasks were
//! added. The backend runs the jobs concurrently once submitted. Neither a job
//! that finishes with an error nor one that outlives the wait timeout stops
//! the queue: every failure and timeout is collected and reported once, after
//! the last job has been waited on.

use bridge_traits::StorageBackend;
use core_runtime::config::CoreConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::load_task::{LoadTask, LoadTaskStatus};
use crate::{Result, SyncError};

pub struct LoadQueue {
    storage: Arc<dyn StorageBackend>,
    wait_timeout: Duration,
    tasks: Vec<LoadTask>,
}

impl LoadQueue {
    pub fn new(storage: Arc<dyn StorageBackend>, wait_timeout: Duration) -> Self {
        Self {
            storage,
            wait_timeout,
            tasks: Vec::new(),
        }
    }

    /// Queue bound to the storage backend and wait timeout of `config`
    pub fn from_core_config(config: &CoreConfig) -> Self {
        Self::new(config.storage_backend.clone(), config.job_wait_timeout)
    }

    pub fn add_task(&mut self, task: LoadTask) {
        self.tasks.push(task);
    }

    pub fn tasks(&self) -> &[LoadTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Submit every pending task in insertion order
    ///
    /// Does not wait for the jobs to finish. The first rejected submission
    /// aborts the call; tasks before it stay submitted.
    #[instrument(skip(self), fields(tasks = self.tasks.len()))]
    pub async fn start(&mut self) -> Result<()> {
        for task in &mut self.tasks {
            let job_id = task.start_import(self.storage.as_ref()).await?;
            info!(table_id = %task.table_id(), job_id = %job_id, "Submitted load job");
        }
        Ok(())
    }

    /// Wait for every submitted job and apply metadata of the successful ones
    ///
    /// Metadata of a task is applied as soon as its own job succeeded, before
    /// the next job is awaited. Each wait is bounded by the queue timeout; a
    /// job that outlives it stays `Submitted` and the remaining jobs are still
    /// awaited. Returns the job ids in submission order.
    ///
    /// # Errors
    ///
    /// - `JobTimeout` naming every job that outlived the timeout, together
    ///   with the failures of the jobs that did finish
    /// - `LoadJobFailed` with every collected failure message once all jobs
    ///   have been waited on
    /// - `InvalidStateTransition` if a task was never submitted
    #[instrument(skip(self), fields(tasks = self.tasks.len()))]
    pub async fn wait_for_all(&mut self) -> Result<Vec<String>> {
        let mut job_ids = Vec::with_capacity(self.tasks.len());
        let mut timed_out = Vec::new();
        let mut failures = Vec::new();

        for task in &mut self.tasks {
            let job_id = match (&task.job_id, task.status) {
                (Some(job_id), LoadTaskStatus::Submitted) => job_id.clone(),
                _ => {
                    return Err(SyncError::InvalidStateTransition {
                        from: task.status.as_str().to_string(),
                        to: "wait".to_string(),
                        reason: format!("Load task for table {} was not submitted", task.table_id()),
                    })
                }
            };

            let outcome =
                match tokio::time::timeout(self.wait_timeout, self.storage.wait_for_job(&job_id)).await {
                    Ok(outcome) => outcome?,
                    Err(_) => {
                        warn!(
                            table_id = %task.table_id(),
                            job_id = %job_id,
                            timeout = ?self.wait_timeout,
                            "Load job did not finish in time"
                        );
                        timed_out.push(job_id);
                        continue;
                    }
                };

            task.complete(&outcome)?;

            if task.status == LoadTaskStatus::Completed {
                info!(table_id = %task.table_id(), job_id = %job_id, "Load job finished");
                task.apply_metadata(self.storage.as_ref()).await?;
            } else {
                let message = format!(
                    "Failed to load table \"{}\": {}",
                    task.table_id(),
                    task.error_message.as_deref().unwrap_or_default()
                );
                warn!(job_id = %job_id, "{}", message);
                failures.push(message);
            }

            job_ids.push(job_id);
        }

        if !timed_out.is_empty() {
            return Err(SyncError::JobTimeout {
                job_ids: timed_out,
                timeout: self.wait_timeout,
                failures,
            });
        }

        if !failures.is_empty() {
            return Err(SyncError::LoadJobFailed { failures });
        }

        Ok(job_ids)
    }
}
