use axum::extract::{Json, Path, State};
use axum::response::IntoResponse;

use crate::daemon::http_server::api::error::{path_id, ApiError};
use crate::daemon::Owner;
use crate::ServiceState;

/// The parent folder of a node, `null` at the root.
pub async fn handler(
    State(state): State<ServiceState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = path_id(&id)?;
    let parent = state.drive().parent(&owner, id).await?;
    Ok(Json(parent))
}
