//! REST endpoint handlers organized by resource.

pub mod errors;
pub mod ingest;
pub mod logs;
pub mod stats;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/metrics`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(ingest::routes())
        .merge(errors::routes())
        .merge(logs::routes())
        .merge(stats::routes())
}
