use axum::extract::{Json, State};
use axum::response::IntoResponse;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::daemon::http_server::api::error::{parent_id, ApiError};
use crate::daemon::Owner;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MkdirRequest {
    pub name: String,
    /// Folder to create in, the root when absent or empty
    #[serde(default)]
    pub parent_id: Option<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Owner(owner): Owner,
    Json(req): Json<MkdirRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let parent = parent_id(req.parent_id.as_deref())?;
    let node = state.drive().mkdir(&owner, parent, &req.name).await?;
    Ok((StatusCode::CREATED, Json(node)))
}
