use axum::extract::{Json, Path, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::daemon::http_server::api::error::{parent_id, path_id, ApiError};
use crate::daemon::Owner;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveRequest {
    /// New parent folder; null or empty moves to the root
    #[serde(default)]
    pub parent_id: Option<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(req): Json<MoveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = path_id(&id)?;
    let new_parent = parent_id(req.parent_id.as_deref())?;
    let node = state.drive().mv(&owner, id, new_parent).await?;
    Ok(Json(node))
}
