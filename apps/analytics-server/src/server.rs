//! Router assembly and process entry point.

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::state::{AppState, SharedState};
use crate::{data, formulas, lookup_tables};
use analytics_storage::Storage;
use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::collections::HashMap;
use tower_http::trace::TraceLayer;

pub const SERVICE_NAME: &str = "Easy AI Analytics API";
pub const SERVICE_VERSION: &str = "1.0.0";

/// Build the axum router with all routes.
pub fn router(state: SharedState) -> Router {
    let cors = state.config.cors_layer();
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(banner))
        // Working dataset
        .route("/upload", post(data::upload_file))
        .route("/saved-data", get(data::saved_data))
        .route("/sample-data", get(data::sample_data))
        .route("/data-info", get(data::data_info))
        .route("/clean-data", post(data::clean_data))
        .route("/detect-outliers", post(data::detect_outliers))
        .route("/remove-outliers", post(data::remove_outliers))
        .route("/convert-type", post(data::convert_type))
        .route("/export-data", get(data::export_data))
        // Lookup table registry
        .route("/upload-lookup-table", post(lookup_tables::upload_lookup_table))
        .route("/lookup-tables", get(lookup_tables::list_lookup_tables))
        .route("/lookup-table/{id}", get(lookup_tables::get_lookup_table))
        .route(
            "/delete-lookup-table/{id}",
            delete(lookup_tables::delete_lookup_table),
        )
        // Formulas
        .route("/apply-vlookup", post(formulas::apply_vlookup))
        .route("/apply-xlookup", post(formulas::apply_xlookup))
        .route("/apply-dax-lookup", post(formulas::apply_dax_lookup))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub fn open_storage(config: &ServerConfig) -> anyhow::Result<Storage> {
    let storage = if config.uses_in_memory_database() {
        Storage::open_in_memory()
    } else {
        Storage::open_path(&config.database)
    };
    storage.with_context(|| format!("opening database {}", config.database.display()))
}

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let storage = open_storage(&config)?;
    let addr = config.bind_addr();
    let state = AppState::new(storage, config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    log::info!("{SERVICE_NAME} {SERVICE_VERSION} listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    log::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Banner {
    pub message: &'static str,
    pub version: &'static str,
}

pub async fn banner() -> Json<Banner> {
    Json(Banner {
        message: SERVICE_NAME,
        version: SERVICE_VERSION,
    })
}

/// Run synchronous work (parsing, profiling, lookups, SQLite) off the async runtime.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

/// A decoded multipart body: the `file` part plus every text field.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let filename = field
                    .file_name()
                    .filter(|f| !f.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::bad_request("No filename provided"))?;
                let bytes = field.bytes().await?;
                form.file = Some(UploadedFile { filename, bytes });
            } else {
                let text = field.text().await?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    pub fn take_file(&mut self) -> Result<UploadedFile, ApiError> {
        self.file
            .take()
            .ok_or_else(|| ApiError::bad_request("No file provided"))
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}
