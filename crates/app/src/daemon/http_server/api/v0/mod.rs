use std::io;

use axum::extract::multipart::Field;
use axum::routing::{delete, get, post};
use axum::Router;
use common::prelude::FileUpload;
use futures::{StreamExt, TryStreamExt};

pub mod delete;
pub mod download;
pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod parent;
pub mod stats;
pub mod unzip;
pub mod upload;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/folders", post(mkdir::handler))
        .route("/folders/:id", get(ls::folder_handler))
        .route("/folders/:id/stats", get(stats::folder_handler))
        .route("/folder/:id/parent", get(parent::handler))
        .route("/files", get(ls::handler))
        .route("/files/upload", post(upload::handler))
        .route("/files/unzip", post(unzip::handler))
        .route("/files/:id", delete(delete::handler))
        .route("/files/:id/download", get(download::handler))
        .route("/move/:id", post(mv::handler))
        .route("/stats", get(stats::root_handler))
        .with_state(state)
}

/// Stream a multipart file field straight through without buffering it.
fn field_upload(field: Field<'_>) -> FileUpload<'_> {
    let file_name = field.file_name().unwrap_or("unnamed").to_string();
    FileUpload::new(file_name, field.map_err(io::Error::other).boxed())
}
