use axum::extract::{Json, Multipart, State};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use common::prelude::{ExtractReport, Node};
use http::StatusCode;
use serde::Serialize;
use uuid::Uuid;

use super::field_upload;
use crate::daemon::http_server::api::error::{parent_id, ApiError};
use crate::daemon::Owner;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize)]
pub struct UnzipResponse {
    pub message: String,
    pub created_count: usize,
    pub created_nodes: Vec<Node>,
    pub created_paths: Vec<String>,
    /// The folder the archive was extracted into
    pub root_parent_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl From<ExtractReport> for UnzipResponse {
    fn from(report: ExtractReport) -> Self {
        Self {
            message: "unzipped successfully".to_string(),
            created_count: report.created_count,
            created_nodes: report.created_nodes,
            created_paths: report.created_paths,
            root_parent_id: report.root_id,
            timestamp: report.completed_at,
        }
    }
}

/// Multipart zip upload, extracted into a new folder under `parent_id`.
///
/// Fields are read in order, so `parent_id` has to come before `file`.
pub async fn handler(
    State(state): State<ServiceState>,
    Owner(owner): Owner,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut parent: Option<Uuid> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "parent_id" => {
                let text = field.text().await?;
                parent = parent_id(Some(&text))?;
            }
            "file" => {
                let upload = field_upload(field);
                tracing::info!(owner = %owner, archive = %upload.file_name, "receiving archive");

                let report = state.drive().unzip(&owner, parent, upload).await?;
                tracing::info!(
                    owner = %owner,
                    root_id = %report.root_id,
                    created = report.created_count,
                    "archive extracted"
                );
                return Ok((StatusCode::CREATED, Json(UnzipResponse::from(report))));
            }
            _ => {}
        }
    }

    Err(ApiError::InvalidRequest("file required".into()))
}
