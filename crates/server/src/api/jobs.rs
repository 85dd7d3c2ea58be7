//! Transfer job polling.

use axum::{extract::State, Json};
use nullfetch_core::Job;
use serde::Serialize;
use std::sync::Arc;

use super::{service_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PollJobsResponse {
    /// Jobs that finished since the previous poll.
    pub completed: Vec<Job>,
}

/// Report jobs completed since the last call.
pub async fn poll_jobs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PollJobsResponse>, ApiError> {
    let completed = state.service().poll_jobs().await.map_err(service_error)?;
    Ok(Json(PollJobsResponse { completed }))
}
