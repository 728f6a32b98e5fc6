//! Health check endpoint for service monitoring.

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::LedgerError, services::LedgerEngine, store::Storage};

/// Health check response.
///
/// Returns service status and storage connectivity.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: String,

    /// Storage backend in use ("memory" or "postgres")
    pub storage: String,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "storage": "postgres",
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// If storage is unreachable, returns the standard error response.
pub async fn health_check<S: Storage>(
    State(engine): State<Arc<LedgerEngine<S>>>,
) -> Result<Json<HealthResponse>, LedgerError> {
    engine.storage().ping().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        storage: engine.storage().backend_name().to_string(),
        timestamp: Utc::now(),
    }))
}
