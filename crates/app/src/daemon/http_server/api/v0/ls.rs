use axum::extract::{Json, Path, Query, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::daemon::http_server::api::error::{parent_id, path_id, ApiError};
use crate::daemon::Owner;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LsQuery {
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// `GET /files?parent_id=`
pub async fn handler(
    State(state): State<ServiceState>,
    Owner(owner): Owner,
    Query(query): Query<LsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let parent = parent_id(query.parent_id.as_deref())?;
    let nodes = state.drive().ls(&owner, parent).await?;
    Ok(Json(nodes))
}

/// `GET /folders/:id`
pub async fn folder_handler(
    State(state): State<ServiceState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = path_id(&id)?;
    let nodes = state.drive().ls(&owner, Some(id)).await?;
    Ok(Json(nodes))
}
