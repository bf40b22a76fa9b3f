use axum::extract::{Json, Multipart, State};
use axum::response::IntoResponse;
use http::StatusCode;
use uuid::Uuid;

use super::field_upload;
use crate::daemon::http_server::api::error::{parent_id, ApiError};
use crate::daemon::Owner;
use crate::ServiceState;

/// Multipart upload of a single file.
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
                let declared_mime = field.content_type().map(str::to_string);
                let upload = field_upload(field);
                tracing::info!(owner = %owner, file = %upload.file_name, "receiving upload");

                let node = state
                    .drive()
                    .add(&owner, parent, upload, declared_mime)
                    .await?;
                return Ok((StatusCode::CREATED, Json(node)));
            }
            _ => {}
        }
    }

    Err(ApiError::InvalidRequest("file required".into()))
}
