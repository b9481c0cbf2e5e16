//! Pipeline stage endpoints.
//!
//! Each endpoint models one host-invoked batch handler: the collector
//! consumes change-source events, the proxy forwards stream records
//! across the size-constrained channel, and the differ appends Durable
//! revisions.

use axum::{extract::State, routing::post, Json, Router};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::handlers::{handle_collect, handle_diff, handle_forward, BatchRequest, BatchSummary};
use crate::AppState;

/// Create pipeline routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(collect_handler))
        .route("/stream", post(forward_handler))
        .route("/revisions", post(diff_handler))
}

/// POST /events - change-source events into the Current table.
async fn collect_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchSummary>> {
    let describer = state
        .describer
        .as_ref()
        .ok_or_else(|| AppError::Config("DESCRIBE_URL".to_string()))?;

    let batch_id = Uuid::new_v4();
    tracing::info!(%batch_id, records = request.records.len(), "Processing collector batch");

    let summary =
        handle_collect(state.current.as_ref(), describer.as_ref(), &state.config, request).await?;
    tracing::info!(%batch_id, ?summary, "Collector batch done");
    Ok(Json(summary))
}

/// POST /stream - forward stream records onto the next-stage channel.
async fn forward_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchSummary>> {
    let publisher = state
        .publisher
        .as_ref()
        .ok_or_else(|| AppError::Config("FORWARD_URL".to_string()))?;

    let batch_id = Uuid::new_v4();
    tracing::info!(%batch_id, records = request.records.len(), "Processing proxy batch");

    let summary = handle_forward(publisher.as_ref(), &state.config, request).await?;
    tracing::info!(%batch_id, ?summary, "Proxy batch done");
    Ok(Json(summary))
}

/// POST /revisions - Current-table stream records into Durable revisions.
async fn diff_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchSummary>> {
    let batch_id = Uuid::new_v4();
    tracing::info!(%batch_id, records = request.records.len(), "Processing differ batch");

    let summary = handle_diff(state.current.as_ref(), state.durable.as_ref(), request).await?;
    tracing::info!(%batch_id, ?summary, "Differ batch done");
    Ok(Json(summary))
}
