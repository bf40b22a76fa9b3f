use axum::extract::multipart::MultipartError;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::prelude::{DriveError, ErrorKind};
use http::StatusCode;
use uuid::Uuid;

/// Failure of any drive endpoint, rendered as `{"error", "message"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Drive(#[from] DriveError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("{0} not found")]
    NotFound(String),
}

impl ApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Drive(e) => e.kind(),
            ApiError::InvalidRequest(_) | ApiError::Multipart(_) => ErrorKind::InvalidInput,
            ApiError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Status of the failure itself. A rolled back extraction answers with
    /// the status of whatever caused the rollback.
    fn status(&self) -> StatusCode {
        let kind = match self {
            ApiError::Drive(e) => e.root_kind(),
            other => other.kind(),
        };
        match kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::InvalidInput | ErrorKind::ResourceExhausted => StatusCode::BAD_REQUEST,
            ErrorKind::StoreFailure | ErrorKind::PartialFailureRecovered => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!("request failed: {}", self);
            match self.kind() {
                ErrorKind::PartialFailureRecovered => {
                    "storage failure, partial changes were rolled back".to_string()
                }
                _ => "storage failure".to_string(),
            }
        } else {
            self.to_string()
        };

        let body = serde_json::json!({
            "error": self.kind(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

/// Ids in the path that don't parse can't name anything.
pub fn path_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("node {}", raw)))
}

/// Absent, null and empty parent ids all mean the root.
pub fn parent_id(raw: Option<&str>) -> Result<Option<Uuid>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Uuid::parse_str(s)
            .map(Some)
            .map_err(|_| ApiError::InvalidRequest(format!("invalid parent_id '{}'", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::prelude::ArchiveViolation;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DriveError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (DriveError::Forbidden(Uuid::nil()), StatusCode::FORBIDDEN),
            (
                DriveError::MoveIntoDescendant {
                    node: Uuid::nil(),
                    target: Uuid::nil(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                DriveError::Archive(ArchiveViolation::TooManyEntries { count: 3, limit: 2 }),
                StatusCode::BAD_REQUEST,
            ),
            (DriveError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_rolled_back_uses_cause_status() {
        let err = ApiError::from(DriveError::RolledBack(Box::new(DriveError::Archive(
            ArchiveViolation::ExtractTooLarge { limit: 1 },
        ))));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ApiError::from(DriveError::RolledBack(Box::new(DriveError::Internal(
            "disk".into(),
        ))));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_parent_id_forms() {
        assert_eq!(parent_id(None).unwrap(), None);
        assert_eq!(parent_id(Some("")).unwrap(), None);
        assert_eq!(parent_id(Some("  ")).unwrap(), None);
        let id = Uuid::new_v4();
        assert_eq!(parent_id(Some(&id.to_string())).unwrap(), Some(id));
        assert!(matches!(
            parent_id(Some("nope")),
            Err(ApiError::InvalidRequest(_))
        ));
        assert!(matches!(path_id("nope"), Err(ApiError::NotFound(_))));
    }
}
