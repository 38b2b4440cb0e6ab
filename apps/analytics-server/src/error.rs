use crate::state::NoDataLoaded;
use analytics_columnar::{ExportError, ImportError, TransformError};
use analytics_lookup::LookupError;
use analytics_storage::StorageError;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

/// Error returned by every handler, rendered as `{"detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn internal(detail: impl fmt::Display) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail.to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.detail)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            log::error!("request failed: {}", self.detail);
        } else {
            log::debug!("request rejected ({}): {}", self.status, self.detail);
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<NoDataLoaded> for ApiError {
    fn from(err: NoDataLoaded) -> Self {
        ApiError::not_found(err.to_string())
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::EmptyInput => ApiError::bad_request("Empty file"),
            ImportError::NoRows => ApiError::bad_request("File contains no data"),
            ImportError::UnsupportedFormat(name) => {
                ApiError::bad_request(format!("Unsupported file format: {name}"))
            }
            ImportError::Io(err) => ApiError::internal(err),
            other => ApiError::bad_request(format!("Error reading file: {other}")),
        }
    }
}

impl From<TransformError> for ApiError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::Dataset(err) => ApiError::internal(err),
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        ApiError::internal(format!("Error exporting data: {err}"))
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::ColumnNotFound { .. } | LookupError::EmptyLookupTable => {
                ApiError::bad_request(err.to_string())
            }
            LookupError::IncomparableKeys { .. }
            | LookupError::NonNumericKey(_)
            | LookupError::Dataset(_) => ApiError::internal(err),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::LookupTableNotFound(_) | StorageError::LookupTableDataMissing(_) => {
                ApiError::not_found(err.to_string())
            }
            other => ApiError::internal(other),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::new(err.status(), err.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::internal(format!("background task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_lookup::TableSide;

    #[test]
    fn lookup_errors_map_to_statuses() {
        let missing = ApiError::from(LookupError::ColumnNotFound {
            column: "Price".into(),
            side: TableSide::Source,
        });
        assert_eq!(missing.status, StatusCode::BAD_REQUEST);
        assert_eq!(missing.detail, "column 'Price' not found in main dataset");

        let mixed = ApiError::from(LookupError::NonNumericKey(analytics_columnar::ValueKind::Text));
        assert_eq!(mixed.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn registry_misses_are_not_found() {
        let err = ApiError::from(StorageError::LookupTableDataMissing(3));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.detail, "Lookup table data not found");
        assert_eq!(ApiError::from(NoDataLoaded).detail, "No data loaded");
    }

    #[test]
    fn import_errors_are_client_errors() {
        let err = ApiError::from(ImportError::UnsupportedFormat("notes.txt".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.detail, "Unsupported file format: notes.txt");
    }
}
