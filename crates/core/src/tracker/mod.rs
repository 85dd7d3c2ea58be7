//! Completion tracking for Transfer Backend jobs.
//!
//! Each poll compares the completed job ids against the previous poll and
//! reports the jobs that finished in between. Jobs that disappear from the
//! listing are forgotten.

use std::collections::HashSet;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::metrics;
use crate::transfer::{Job, TransferBackend, TransferError};

/// Result of comparing a job snapshot with the previous completed set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletionDiff {
    /// Jobs completed now but not at the previous poll, in snapshot order.
    pub newly_completed: Vec<Job>,
    /// Ids of every job completed in this snapshot.
    pub next_ids: HashSet<String>,
}

/// Stateless diff of job snapshots.
pub struct CompletionTracker;

impl CompletionTracker {
    pub fn diff(previous_ids: &HashSet<String>, snapshot: &[Job]) -> CompletionDiff {
        let mut diff = CompletionDiff::default();

        for job in snapshot.iter().filter(|job| job.is_completed()) {
            if diff.next_ids.insert(job.id.clone()) && !previous_ids.contains(&job.id) {
                diff.newly_completed.push(job.clone());
            }
        }

        diff
    }
}

/// Holds the previous completed set between polls.
#[derive(Debug, Default)]
pub struct CompletionWatcher {
    previous_ids: Mutex<HashSet<String>>,
}

impl CompletionWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// List jobs from `backend` and return the newly completed ones.
    ///
    /// On a listing error the previous set is kept.
    pub async fn poll(&self, backend: &dyn TransferBackend) -> Result<Vec<Job>, TransferError> {
        let snapshot = backend.list_jobs().await?;
        Ok(self.observe(&snapshot).await)
    }

    /// Apply an already fetched snapshot.
    pub async fn observe(&self, snapshot: &[Job]) -> Vec<Job> {
        let mut previous = self.previous_ids.lock().await;
        let diff = CompletionTracker::diff(&previous, snapshot);
        *previous = diff.next_ids;

        debug!(
            jobs = snapshot.len(),
            completed = previous.len(),
            new = diff.newly_completed.len(),
            "Polled offline jobs"
        );
        for job in &diff.newly_completed {
            info!(id = %job.id, name = %job.name, "Offline job completed");
        }
        metrics::JOBS_COMPLETED.inc_by(diff.newly_completed.len() as u64);

        diff.newly_completed
    }

    /// Ids currently considered completed.
    pub async fn known_completed(&self) -> HashSet<String> {
        self.previous_ids.lock().await.clone()
    }
}
