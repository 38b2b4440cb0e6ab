//! Lookup table registry endpoints.

use crate::error::ApiError;
use crate::server::{run_blocking, UploadForm};
use crate::state::{AppState, SharedState};
use analytics_columnar::{basic_info, import_file, profile, BasicInfo};
use analytics_storage::{DataType, LookupTableSummary, NewDataset};
use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LookupTableDetail {
    #[serde(flatten)]
    pub summary: LookupTableSummary,
    pub basic_info: BasicInfo,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn upload_lookup_table(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<LookupTableSummary>, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file()?;
    let name = form
        .field("table_name")
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("table_name is required"))?;

    let summary =
        run_blocking(move || register_lookup_table(&state, &name, &file.filename, &file.bytes))
            .await?;
    Ok(Json(summary))
}

/// Parse an uploaded table and persist it in the registry under `name`.
pub fn register_lookup_table(
    state: &AppState,
    name: &str,
    filename: &str,
    bytes: &[u8],
) -> Result<LookupTableSummary, ApiError> {
    let dataset = import_file(filename, bytes)?;
    let report = profile(&dataset, state.preview_rows());
    let meta = state.storage.save_dataset(NewDataset {
        name,
        filename,
        data_type: DataType::LookupTable,
        dataset: &dataset,
        profile: &report,
    })?;

    Ok(LookupTableSummary {
        id: meta.id,
        name: meta.name,
        rows: meta.rows,
        columns: meta.columns,
        column_info: serde_json::to_value(&report.column_info).map_err(ApiError::internal)?,
        preview: serde_json::to_value(&report.preview).map_err(ApiError::internal)?,
    })
}

pub async fn list_lookup_tables(
    State(state): State<SharedState>,
) -> Result<Json<Vec<LookupTableSummary>>, ApiError> {
    let tables = run_blocking(move || Ok(state.storage.list_lookup_tables()?)).await?;
    Ok(Json(tables))
}

pub async fn get_lookup_table(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<LookupTableDetail>, ApiError> {
    let detail = run_blocking(move || lookup_table_detail(&state, id)).await?;
    Ok(Json(detail))
}

pub fn lookup_table_detail(state: &AppState, id: i64) -> Result<LookupTableDetail, ApiError> {
    let summary = state.storage.lookup_table_summary(id)?;
    let dataset = state.storage.load_lookup_table(id)?;
    Ok(LookupTableDetail {
        summary,
        basic_info: basic_info(&dataset),
    })
}

pub async fn delete_lookup_table(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    run_blocking(move || Ok(state.storage.delete_lookup_table(id)?)).await?;
    Ok(Json(MessageResponse {
        message: "Lookup table deleted successfully".to_string(),
    }))
}
