//! This module defines the read-only HTTP endpoints of the log viewer.
use super::{viewer_url, ViewerState};
use crate::logging::LogEntry;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

/// Response structure for `/api/info`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    /// The port the viewer is bound to.
    pub port: u16,
    /// The URL of the viewer page.
    pub url: String,
    /// Number of entries currently held in history.
    pub entries: usize,
    /// Maximum number of entries history holds.
    pub max_history: usize,
    /// Number of observers connected to the push channel.
    pub observers: usize,
}

/// Returns the redacted history, oldest first.
pub async fn get_history(State(state): State<Arc<ViewerState>>) -> Json<Vec<LogEntry>> {
    let entries = state
        .hub
        .history()
        .iter()
        .map(|entry| entry.redacted())
        .collect();
    Json(entries)
}

/// Returns where the viewer runs and how full its history is.
pub async fn get_info(State(state): State<Arc<ViewerState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        port: state.port,
        url: viewer_url(state.port),
        entries: state.hub.len(),
        max_history: state.hub.capacity(),
        observers: state.hub.observer_count(),
    })
}
