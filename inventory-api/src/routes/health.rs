/// Liveness, version and health check endpoints
///
/// # Endpoints
///
/// - `GET /`: plain-text liveness message
/// - `GET /version`: application name and version
/// - `GET /health`: service status including database connectivity
///
/// # Example
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected"
/// }
/// ```

use crate::app::AppState;
use axum::{extract::State, Json};
use inventory_shared::db::pool::health_check as db_health_check;
use serde::{Deserialize, Serialize};

/// Name reported by `/version`
pub const APP_NAME: &str = "Super Inventory";

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    /// Application version
    pub version: String,

    /// `connected`, `disconnected`, or `in-memory` without a database
    pub database: String,
}

/// Version response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    pub success: bool,
    pub version: String,
    pub app_name: String,
}

pub async fn root() -> &'static str {
    "Server is running!"
}

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        success: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        app_name: APP_NAME.to_string(),
    })
}

/// Health check handler
///
/// Always answers 200; a failing database shows up as `degraded`.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match &state.db {
        Some(pool) => match db_health_check(pool).await {
            Ok(()) => "connected",
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                "disconnected"
            }
        },
        None => "in-memory",
    };

    Json(HealthResponse {
        status: if database == "disconnected" {
            "degraded".to_string()
        } else {
            "healthy".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
    })
}
