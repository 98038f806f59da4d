use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use super::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub payment_highway_url: String,
    pub database_connected: bool,
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let version = env!("CARGO_PKG_VERSION").to_string();

    #[cfg(feature = "database")]
    let database_connected = match &state.pool {
        Some(pool) => crate::database::health_check(pool).await.is_ok(),
        None => false,
    };
    #[cfg(not(feature = "database"))]
    let database_connected = false;

    let response = HealthResponse {
        status: "healthy".to_string(),
        version,
        environment: state.config.server.environment.clone(),
        payment_highway_url: state.config.payment_highway.service_url().to_string(),
        database_connected,
    };

    Ok(Json(response))
}
