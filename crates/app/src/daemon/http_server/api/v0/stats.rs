use axum::extract::{Json, Path, Query, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::daemon::http_server::api::error::{path_id, ApiError};
use crate::daemon::Owner;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsQuery {
    /// Only the literal `true` (any case) turns recursion on
    #[serde(default)]
    pub recursive: Option<String>,
}

impl StatsQuery {
    fn recursive(&self) -> bool {
        self.recursive
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

/// `GET /folders/:id/stats`
pub async fn folder_handler(
    State(state): State<ServiceState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let id = path_id(&id)?;
    let stats = state
        .drive()
        .stats(&owner, Some(id), query.recursive())
        .await?;
    Ok(Json(stats))
}

/// `GET /stats`
pub async fn root_handler(
    State(state): State<ServiceState>,
    Owner(owner): Owner,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.drive().stats(&owner, None, query.recursive()).await?;
    Ok(Json(stats))
}
