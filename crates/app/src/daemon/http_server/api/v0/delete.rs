use axum::extract::{Path, State};
use axum::response::IntoResponse;
use http::StatusCode;

use crate::daemon::http_server::api::error::{path_id, ApiError};
use crate::daemon::Owner;
use crate::ServiceState;

/// Delete a file, or a folder with everything under it.
pub async fn handler(
    State(state): State<ServiceState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = path_id(&id)?;
    let removed = state.drive().rm(&owner, id).await?;
    tracing::info!(owner = %owner, node_id = %id, removed, "deleted");
    Ok(StatusCode::NO_CONTENT)
}
