//! Handlers that load, inspect and transform the working dataset.

use crate::error::ApiError;
use crate::extract::ApiForm;
use crate::sample;
use crate::server::{run_blocking, UploadForm};
use crate::state::{AppState, SharedState};
use analytics_columnar::{
    clean_missing, convert_column, detect_outliers as find_outliers, export_csv, import_file,
    profile, remove_outliers as drop_outliers, BasicInfo, CleanMethod, ConversionTarget,
    Dataset, DatasetProfile, OutlierMethod, PreviewRow,
};
use analytics_storage::{DataType, NewDataset};
use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Outlier row ids echoed back to the client.
pub const OUTLIER_SAMPLE: usize = 10;
pub const EXPORT_FILENAME: &str = "exported_data.csv";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProfileResponse {
    pub message: String,
    #[serde(flatten)]
    pub profile: DatasetProfile,
}

impl ProfileResponse {
    pub fn new(message: impl Into<String>, profile: DatasetProfile) -> Self {
        Self {
            message: message.into(),
            profile,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UploadResponse {
    pub message: String,
    pub dataset_id: i64,
    #[serde(flatten)]
    pub profile: DatasetProfile,
}

/// `/saved-data` either profiles the latest original upload or reports that none exists.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SavedDataResponse {
    Found(ProfileResponse),
    Empty {
        message: String,
        data: Option<()>,
    },
}

/// Profile minus column statistics, returned after row- or value-level edits.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransformResponse {
    pub message: String,
    pub basic_info: BasicInfo,
    pub preview: Vec<PreviewRow>,
}

impl TransformResponse {
    fn new(message: String, dataset: &Dataset, preview_rows: usize) -> Self {
        let report = profile(dataset, preview_rows);
        Self {
            message,
            basic_info: report.basic_info,
            preview: report.preview,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutlierResponse {
    pub column: String,
    pub method: String,
    pub outlier_count: usize,
    pub outlier_indices: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExportResponse {
    pub csv_data: String,
    pub filename: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanForm {
    pub method: String,
    #[serde(default)]
    pub fill_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutlierForm {
    pub column: String,
    #[serde(default = "default_outlier_method")]
    pub method: String,
}

fn default_outlier_method() -> String {
    "zscore".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConvertForm {
    pub column: String,
    pub target_type: String,
}

pub async fn upload_file(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let file = UploadForm::read(multipart).await?.take_file()?;
    let response = run_blocking(move || ingest_upload(&state, &file.filename, &file.bytes)).await?;
    Ok(Json(response))
}

/// Parse an upload, persist it as the latest original and make it the working dataset.
pub fn ingest_upload(
    state: &AppState,
    filename: &str,
    bytes: &[u8],
) -> Result<UploadResponse, ApiError> {
    let dataset = import_file(filename, bytes)?;
    let report = profile(&dataset, state.preview_rows());
    let meta = state.storage.save_dataset(NewDataset {
        name: filename,
        filename,
        data_type: DataType::Original,
        dataset: &dataset,
        profile: &report,
    })?;
    state.working.load(dataset);

    Ok(UploadResponse {
        message: "File uploaded and saved successfully".to_string(),
        dataset_id: meta.id,
        profile: report,
    })
}

pub async fn saved_data(
    State(state): State<SharedState>,
) -> Result<Json<SavedDataResponse>, ApiError> {
    let response = run_blocking(move || {
        let latest = state.storage.latest_original()?;
        Ok(match latest {
            Some((meta, dataset)) => {
                log::debug!("profiling saved dataset {} ({})", meta.id, meta.name);
                SavedDataResponse::Found(ProfileResponse::new(
                    "Saved data loaded successfully",
                    profile(&dataset, state.preview_rows()),
                ))
            }
            None => SavedDataResponse::Empty {
                message: "No saved data available".to_string(),
                data: None,
            },
        })
    })
    .await?;
    Ok(Json(response))
}

pub async fn sample_data(
    State(state): State<SharedState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let response = run_blocking(move || {
        let dataset = sample::sales_dataset().map_err(ApiError::internal)?;
        let report = profile(&dataset, state.preview_rows());
        state.working.load(dataset);
        Ok(ProfileResponse::new("Sample data loaded successfully", report))
    })
    .await?;
    Ok(Json(response))
}

pub async fn data_info(
    State(state): State<SharedState>,
) -> Result<Json<DatasetProfile>, ApiError> {
    let current = state.working.snapshot()?;
    let report = run_blocking(move || Ok(profile(&current, state.preview_rows()))).await?;
    Ok(Json(report))
}

pub async fn clean_data(
    State(state): State<SharedState>,
    ApiForm(form): ApiForm<CleanForm>,
) -> Result<Json<TransformResponse>, ApiError> {
    let response = run_blocking(move || clean(&state, &form)).await?;
    Ok(Json(response))
}

pub fn clean(state: &AppState, form: &CleanForm) -> Result<TransformResponse, ApiError> {
    let cleaned = state.working.update(|current| {
        let method = CleanMethod::from_parts(&form.method, form.fill_value.as_deref())?;
        clean_missing(current, &method).map_err(ApiError::from)
    })?;
    Ok(TransformResponse::new(
        format!("Data cleaned using {} method", form.method),
        &cleaned,
        state.preview_rows(),
    ))
}

pub async fn detect_outliers(
    State(state): State<SharedState>,
    ApiForm(form): ApiForm<OutlierForm>,
) -> Result<Json<OutlierResponse>, ApiError> {
    let current = state.working.snapshot()?;
    let response = run_blocking(move || outlier_report(&current, &form)).await?;
    Ok(Json(response))
}

pub fn outlier_report(dataset: &Dataset, form: &OutlierForm) -> Result<OutlierResponse, ApiError> {
    let method: OutlierMethod = form.method.parse()?;
    let mut ids = find_outliers(dataset, &form.column, method)?;
    let outlier_count = ids.len();
    ids.truncate(OUTLIER_SAMPLE);
    Ok(OutlierResponse {
        column: form.column.clone(),
        method: form.method.clone(),
        outlier_count,
        outlier_indices: ids,
    })
}

pub async fn remove_outliers(
    State(state): State<SharedState>,
    ApiForm(form): ApiForm<OutlierForm>,
) -> Result<Json<TransformResponse>, ApiError> {
    let response = run_blocking(move || remove(&state, &form)).await?;
    Ok(Json(response))
}

pub fn remove(state: &AppState, form: &OutlierForm) -> Result<TransformResponse, ApiError> {
    let kept = state.working.update(|current| {
        let method: OutlierMethod = form.method.parse()?;
        drop_outliers(current, &form.column, method).map_err(ApiError::from)
    })?;
    Ok(TransformResponse::new(
        format!(
            "Outliers removed from {} using {} method",
            form.column, form.method
        ),
        &kept,
        state.preview_rows(),
    ))
}

pub async fn convert_type(
    State(state): State<SharedState>,
    ApiForm(form): ApiForm<ConvertForm>,
) -> Result<Json<TransformResponse>, ApiError> {
    let response = run_blocking(move || convert(&state, &form)).await?;
    Ok(Json(response))
}

pub fn convert(state: &AppState, form: &ConvertForm) -> Result<TransformResponse, ApiError> {
    let converted = state.working.update(|current| {
        let target: ConversionTarget = form.target_type.parse()?;
        convert_column(current, &form.column, target).map_err(ApiError::from)
    })?;
    Ok(TransformResponse::new(
        format!("Converted {} to {}", form.column, form.target_type),
        &converted,
        state.preview_rows(),
    ))
}

pub async fn export_data(
    State(state): State<SharedState>,
) -> Result<Json<ExportResponse>, ApiError> {
    let current = state.working.snapshot()?;
    let csv_data = run_blocking(move || Ok(export_csv(&current)?)).await?;
    Ok(Json(ExportResponse {
        csv_data,
        filename: EXPORT_FILENAME,
    }))
}
