//! Spreadsheet-style lookup endpoints: VLOOKUP, XLOOKUP and DAX LOOKUPVALUE.

use crate::data::ProfileResponse;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::server::run_blocking;
use crate::state::{AppState, SharedState};
use analytics_columnar::{profile, Value};
use analytics_lookup::{apply, FilterPredicate, MatchMode, MatchRequest};
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

fn empty_fallback() -> serde_json::Value {
    serde_json::Value::String(String::new())
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VlookupRequest {
    pub lookup_table_id: i64,
    pub lookup_column: String,
    pub return_column: String,
    pub result_column_name: String,
    #[serde(default = "empty_fallback")]
    pub if_not_found: serde_json::Value,
    /// `false` selects the nearest key instead of an exact match.
    #[serde(default = "default_true")]
    pub exact_match: bool,
}

impl VlookupRequest {
    pub fn to_match_request(&self) -> MatchRequest {
        let mode = if self.exact_match {
            MatchMode::Exact
        } else {
            MatchMode::ApproximateNearest
        };
        MatchRequest::keyed(
            &self.lookup_column,
            &self.return_column,
            &self.result_column_name,
            mode,
        )
        .with_fallback(Value::from_json(&self.if_not_found))
    }
}

/// XLOOKUP match modes accepted over HTTP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XlookupSearchMode {
    #[default]
    Exact,
    ExactOrNext,
    ExactOrPrevious,
    Wildcard,
}

impl From<XlookupSearchMode> for MatchMode {
    fn from(mode: XlookupSearchMode) -> Self {
        match mode {
            XlookupSearchMode::Exact => MatchMode::Exact,
            XlookupSearchMode::ExactOrNext => MatchMode::ExactOrNext,
            XlookupSearchMode::ExactOrPrevious => MatchMode::ExactOrPrevious,
            XlookupSearchMode::Wildcard => MatchMode::Wildcard,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XlookupRequest {
    pub lookup_table_id: i64,
    pub lookup_column: String,
    pub return_column: String,
    pub result_column_name: String,
    #[serde(default = "empty_fallback")]
    pub if_not_found: serde_json::Value,
    #[serde(default)]
    pub search_mode: XlookupSearchMode,
}

impl XlookupRequest {
    pub fn to_match_request(&self) -> MatchRequest {
        MatchRequest::keyed(
            &self.lookup_column,
            &self.return_column,
            &self.result_column_name,
            self.search_mode.into(),
        )
        .with_fallback(Value::from_json(&self.if_not_found))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaxLookupRequest {
    pub lookup_table_id: i64,
    pub return_column: String,
    pub result_column_name: String,
    #[serde(default)]
    pub filters: Vec<FilterPredicate>,
    #[serde(default = "empty_fallback")]
    pub if_not_found: serde_json::Value,
}

impl DaxLookupRequest {
    pub fn to_match_request(&self) -> MatchRequest {
        MatchRequest::filtered_first(
            &self.return_column,
            &self.result_column_name,
            self.filters.clone(),
        )
        .with_fallback(Value::from_json(&self.if_not_found))
    }
}

pub async fn apply_vlookup(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<VlookupRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let request = req.to_match_request();
    let response = run_blocking(move || {
        apply_lookup(&state, req.lookup_table_id, &request, "VLOOKUP applied successfully")
    })
    .await?;
    Ok(Json(response))
}

pub async fn apply_xlookup(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<XlookupRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let request = req.to_match_request();
    let response = run_blocking(move || {
        apply_lookup(&state, req.lookup_table_id, &request, "XLOOKUP applied successfully")
    })
    .await?;
    Ok(Json(response))
}

pub async fn apply_dax_lookup(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<DaxLookupRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let request = req.to_match_request();
    let response = run_blocking(move || {
        apply_lookup(
            &state,
            req.lookup_table_id,
            &request,
            "DAX LOOKUPVALUE applied successfully",
        )
    })
    .await?;
    Ok(Json(response))
}

/// Resolve the lookup table and derive the result column on the working dataset.
///
/// Checks run in the order clients see them: no working dataset, unknown
/// table, then column validation inside the lookup engine.
pub fn apply_lookup(
    state: &AppState,
    table_id: i64,
    request: &MatchRequest,
    message: &str,
) -> Result<ProfileResponse, ApiError> {
    state.working.snapshot()?;
    let lookup = state.storage.load_lookup_table(table_id)?;
    let updated = state
        .working
        .update(|current| apply(current, &lookup, request).map_err(ApiError::from))?;
    log::info!(
        "applied lookup against table {table_id} into column '{}'",
        request.result_column
    );
    Ok(ProfileResponse::new(
        message,
        profile(&updated, state.preview_rows()),
    ))
}
