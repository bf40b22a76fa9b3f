use std::time::Duration;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use tokio::time::timeout;

use crate::ServiceState;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[tracing::instrument(skip(state))]
pub async fn handler(State(state): State<ServiceState>) -> Response {
    match timeout(HEALTH_CHECK_TIMEOUT, state.drive().nodes().ping()).await {
        Ok(Ok(())) => {
            let msg = serde_json::json!({"status": "ok"});
            (StatusCode::OK, Json(msg)).into_response()
        }
        Ok(Err(e)) => {
            tracing::warn!("readiness check failed: {}", e);
            let msg = serde_json::json!({
                "status": "failure",
                "message": "node store isn't available"
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(msg)).into_response()
        }
        Err(_) => {
            let msg = serde_json::json!({
                "status": "failure",
                "message": "health check timed out"
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(msg)).into_response()
        }
    }
}
