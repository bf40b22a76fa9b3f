use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use http::StatusCode;

use crate::daemon::http_server::api::error::{path_id, ApiError};
use crate::daemon::Owner;
use crate::ServiceState;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

pub async fn handler(
    State(state): State<ServiceState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = path_id(&id)?;
    let (node, content) = state.drive().cat(&owner, id).await?;

    let content_type = node
        .mime
        .clone()
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());
    let disposition = format!("attachment; filename=\"{}\"", quoted_name(&node.name));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, node.size.to_string()),
        ],
        Body::from_stream(content),
    )
        .into_response())
}

/// Keep the header parseable whatever the stored name contains.
fn quoted_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_name() {
        assert_eq!(quoted_name("report.pdf"), "report.pdf");
        assert_eq!(quoted_name("a\"b\\c\nd"), "a_b_c_d");
    }
}
