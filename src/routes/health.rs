use axum::{response::IntoResponse, response::Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct HealthStatus {
    status: String,
}

/// Liveness probe for the kiosk deployments.
pub async fn healthcheck() -> impl IntoResponse {
    Json(HealthStatus {
        status: "Available".into(),
    })
}
