use axum::extract::State;
use axum::Json;
use tracing::info;

use crate::errors::AppError;
use crate::indexing::IndexReport;
use crate::state::AppState;

/// `POST /embeddings/initialize`: rebuilds the vector index from the resume tables.
pub async fn handle_initialize_embeddings(
    State(state): State<AppState>,
) -> Result<Json<IndexReport>, AppError> {
    info!("Rebuilding embedding index");
    let report = state
        .indexer
        .initialize()
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(Json(report))
}
