//! Search, selection and download handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use nullfetch_core::{
    DispatchResult, DownloadMode, DownloadOptions, DownloadOutcome, MediaItem, ResourceEntry,
    Selection,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{service_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for a keyword search
#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub user_id: String,
    pub keyword: String,
    /// 1-based result page
    #[serde(default)]
    pub page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub keyword: String,
    pub page: u32,
    pub count: usize,
    pub items: Vec<MediaItem>,
}

/// Request body for selecting a cached result
#[derive(Debug, Deserialize)]
pub struct SelectBody {
    pub user_id: String,
    /// 1-based index into the user's last search
    pub index: usize,
    /// Resource kind alias; omitted means "follow the priority list"
    #[serde(default)]
    pub kind: Option<String>,
}

/// Request body for select-and-dispatch
#[derive(Debug, Deserialize)]
pub struct DownloadBody {
    pub user_id: String,
    pub index: usize,
    #[serde(default)]
    pub kind: Option<String>,
    /// 1-based entry within the resolved bundle
    #[serde(default)]
    pub entry: Option<usize>,
    #[serde(default)]
    pub mode: Option<DownloadMode>,
    #[serde(default)]
    pub destination: Option<String>,
}

/// Request body for dispatching an entry directly
#[derive(Debug, Deserialize)]
pub struct DispatchBody {
    pub entry: ResourceEntry,
    #[serde(default)]
    pub mode: Option<DownloadMode>,
    #[serde(default)]
    pub destination: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResponse>, ApiError> {
    let page = body.page.unwrap_or(1).max(1);
    let items = state
        .service()
        .search(&body.user_id, &body.keyword, page)
        .await
        .map_err(service_error)?;

    Ok(Json(SearchResponse {
        keyword: body.keyword.trim().to_string(),
        page,
        count: items.len(),
        items,
    }))
}

pub async fn select(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SelectBody>,
) -> Result<Json<Selection>, ApiError> {
    let service = state.service();
    let selection = match body.kind.as_deref() {
        Some(kind) => {
            service
                .select_by_index_and_kind(&body.user_id, body.index, kind)
                .await
        }
        None => service.select_by_index(&body.user_id, body.index).await,
    };
    selection.map(Json).map_err(service_error)
}

pub async fn download(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DownloadBody>,
) -> Result<Json<DownloadOutcome>, ApiError> {
    let options = DownloadOptions {
        kind: body.kind,
        entry: body.entry,
        mode: body.mode,
        destination: body.destination,
    };
    state
        .service()
        .download(&body.user_id, body.index, options)
        .await
        .map(Json)
        .map_err(service_error)
}

/// Dispatch an entry the caller already holds.
///
/// Backend failures are reported in the result body, not as an HTTP error.
pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DispatchBody>,
) -> Json<DispatchResult> {
    Json(
        state
            .service()
            .dispatch(&body.entry, body.mode, body.destination.as_deref())
            .await,
    )
}

pub async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> StatusCode {
    state.service().clear_session(&user_id).await;
    StatusCode::NO_CONTENT
}
