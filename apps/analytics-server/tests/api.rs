use analytics_columnar::Value;
use analytics_lookup::FilterPredicate;
use analytics_server::data::{self, CleanForm, ConvertForm, OutlierForm, SavedDataResponse};
use analytics_server::formulas::{
    self, DaxLookupRequest, VlookupRequest, XlookupRequest, XlookupSearchMode,
};
use analytics_server::lookup_tables;
use analytics_server::extract::{ApiForm, ApiJson};
use analytics_server::{router, ApiError, AppState, ServerConfig, SharedState};
use analytics_storage::Storage;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

const ORDERS: &str = "Product,Qty\nA,1\nB,2\nC,\nD,4\n";
const PRICES: &str = "Product,Price,Region\nA,10,East\nB,20,West\nA,15,West\n";
const SCORES: &str = "Student,Score\nann,25\nbob,30\ncal,35\n";
const TIERS: &str = "Score,Tier\n10,bronze\n20,silver\n30,gold\n";

fn new_state() -> SharedState {
    let storage = Storage::open_in_memory().expect("open storage");
    AppState::new(storage, ServerConfig::default())
}

fn upload(state: &SharedState, filename: &str, csv: &str) -> i64 {
    data::ingest_upload(state, filename, csv.as_bytes())
        .expect("upload")
        .dataset_id
}

fn register(state: &SharedState, name: &str, csv: &str) -> i64 {
    lookup_tables::register_lookup_table(state, name, &format!("{name}.csv"), csv.as_bytes())
        .expect("register lookup table")
        .id
}

fn column(state: &SharedState, name: &str) -> Vec<Value> {
    state
        .working
        .snapshot()
        .expect("loaded")
        .column(name)
        .expect("column present")
        .values()
        .to_vec()
}

fn vlookup(table: i64, key: &str, ret: &str, exact: bool) -> VlookupRequest {
    serde_json::from_value(json!({
        "lookupTableId": table,
        "lookupColumn": key,
        "returnColumn": ret,
        "resultColumnName": ret,
        "exactMatch": exact
    }))
    .expect("decode vlookup request")
}

#[tokio::test]
async fn vlookup_appends_column_with_last_row_winning() {
    let state = new_state();
    upload(&state, "orders.csv", ORDERS);
    let prices = register(&state, "prices", PRICES);

    let Json(response) = formulas::apply_vlookup(
        State(state.clone()),
        ApiJson(vlookup(prices, "Product", "Price", true)),
    )
    .await
    .expect("vlookup");

    assert_eq!(response.message, "VLOOKUP applied successfully");
    assert_eq!(response.profile.basic_info.columns, 3);
    assert_eq!(
        column(&state, "Price"),
        vec![Value::from(15), Value::from(20), Value::from(""), Value::from("")]
    );
}

#[tokio::test]
async fn approximate_vlookup_prefers_lower_key_on_ties() {
    let state = new_state();
    upload(&state, "scores.csv", SCORES);
    let tiers = register(&state, "tiers", TIERS);

    formulas::apply_vlookup(State(state.clone()), ApiJson(vlookup(tiers, "Score", "Tier", false)))
        .await
        .expect("vlookup");
    assert_eq!(
        column(&state, "Tier"),
        vec![Value::from("silver"), Value::from("gold"), Value::from("gold")]
    );
}

#[tokio::test]
async fn xlookup_modes_and_fallback() {
    let state = new_state();
    upload(&state, "scores.csv", SCORES);
    let tiers = register(&state, "tiers", TIERS);

    let next = XlookupRequest {
        lookup_table_id: tiers,
        lookup_column: "Score".into(),
        return_column: "Tier".into(),
        result_column_name: "Next".into(),
        if_not_found: json!("n/a"),
        search_mode: XlookupSearchMode::ExactOrNext,
    };
    let previous = XlookupRequest {
        result_column_name: "Previous".into(),
        search_mode: XlookupSearchMode::ExactOrPrevious,
        ..next.clone()
    };

    let Json(response) = formulas::apply_xlookup(State(state.clone()), ApiJson(next))
        .await
        .expect("xlookup next");
    assert_eq!(response.message, "XLOOKUP applied successfully");
    formulas::apply_xlookup(State(state.clone()), ApiJson(previous))
        .await
        .expect("xlookup previous");

    assert_eq!(
        column(&state, "Next"),
        vec![Value::from("gold"), Value::from("gold"), Value::from("n/a")]
    );
    assert_eq!(
        column(&state, "Previous"),
        vec![Value::from("silver"), Value::from("gold"), Value::from("gold")]
    );
}

#[tokio::test]
async fn dax_lookup_broadcasts_first_filtered_row() {
    let state = new_state();
    upload(&state, "orders.csv", ORDERS);
    let prices = register(&state, "prices", PRICES);

    let request = DaxLookupRequest {
        lookup_table_id: prices,
        return_column: "Price".into(),
        result_column_name: "WestPrice".into(),
        filters: vec![FilterPredicate::new("Region", "West")],
        if_not_found: json!(""),
    };
    let Json(response) = formulas::apply_dax_lookup(State(state.clone()), ApiJson(request))
        .await
        .expect("dax lookup");

    assert_eq!(response.message, "DAX LOOKUPVALUE applied successfully");
    assert_eq!(column(&state, "WestPrice"), vec![Value::from(20); 4]);
    assert_eq!(response.profile.preview[0]["WestPrice"], json!(20.0));
}

#[tokio::test]
async fn lookup_errors_leave_working_dataset_untouched() {
    let state = new_state();

    // Nothing loaded: reported before the table is resolved.
    let err = formulas::apply_vlookup(State(state.clone()), ApiJson(vlookup(999, "Product", "Price", true)))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::not_found("No data loaded"));

    let original = upload(&state, "orders.csv", ORDERS);
    let prices = register(&state, "prices", PRICES);
    let before = state.working.snapshot().unwrap();

    let err = formulas::apply_vlookup(State(state.clone()), ApiJson(vlookup(999, "Product", "Price", true)))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::not_found("Lookup table not found"));

    let err = formulas::apply_vlookup(
        State(state.clone()),
        ApiJson(vlookup(original, "Product", "Price", true)),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::not_found("Lookup table data not found"));

    let err = formulas::apply_vlookup(State(state.clone()), ApiJson(vlookup(prices, "Sku", "Price", true)))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.detail, "column 'Sku' not found in main dataset");

    let err = formulas::apply_vlookup(State(state.clone()), ApiJson(vlookup(prices, "Product", "Cost", true)))
        .await
        .unwrap_err();
    assert_eq!(err.detail, "column 'Cost' not found in lookup table");

    assert!(Arc::ptr_eq(&before, &state.working.snapshot().unwrap()));
}

#[tokio::test]
async fn cleaning_outliers_conversion_and_export() {
    let state = new_state();
    let err = data::data_info(State(state.clone())).await.unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);

    upload(&state, "orders.csv", ORDERS);

    let Json(cleaned) = data::clean_data(
        State(state.clone()),
        ApiForm(CleanForm {
            method: "drop".into(),
            fill_value: None,
        }),
    )
    .await
    .expect("clean");
    assert_eq!(cleaned.message, "Data cleaned using drop method");
    assert_eq!(cleaned.basic_info.rows, 3);

    let err = data::clean_data(
        State(state.clone()),
        ApiForm(CleanForm {
            method: "custom".into(),
            fill_value: None,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);

    let Json(converted) = data::convert_type(
        State(state.clone()),
        ApiForm(ConvertForm {
            column: "Qty".into(),
            target_type: "string".into(),
        }),
    )
    .await
    .expect("convert");
    assert_eq!(converted.message, "Converted Qty to string");
    assert_eq!(converted.preview[0]["Qty"], json!("1"));

    let Json(export) = data::export_data(State(state.clone())).await.expect("export");
    assert_eq!(export.filename, "exported_data.csv");
    assert_eq!(export.csv_data, "Product,Qty\nA,1\nB,2\nD,4\n");

    // The original upload is still available for reference.
    assert_eq!(state.working.original().unwrap().row_count(), 4);
}

#[tokio::test]
async fn outlier_detection_reports_row_ids() {
    let state = new_state();
    let mut csv = String::from("Reading\n");
    for v in [10, 11, 12, 13, 14, 15, 16, 17, 18, 500] {
        csv.push_str(&format!("{v}\n"));
    }
    upload(&state, "readings.csv", &csv);

    let form = OutlierForm {
        column: "Reading".into(),
        method: "iqr".into(),
    };
    let Json(report) = data::detect_outliers(State(state.clone()), ApiForm(form.clone()))
        .await
        .expect("detect");
    assert_eq!(report.outlier_count, 1);
    assert_eq!(report.outlier_indices, vec![9]);

    let Json(removed) = data::remove_outliers(State(state.clone()), ApiForm(form))
        .await
        .expect("remove");
    assert_eq!(removed.message, "Outliers removed from Reading using iqr method");
    assert_eq!(removed.basic_info.rows, 9);

    // Nine readings remain, below the isolation forest minimum.
    let Json(forest) = data::detect_outliers(
        State(state.clone()),
        ApiForm(OutlierForm {
            column: "Reading".into(),
            method: "isolation_forest".into(),
        }),
    )
    .await
    .expect("isolation forest");
    assert_eq!(forest.method, "isolation_forest");
    assert_eq!(forest.outlier_count, 0);

    let err = data::detect_outliers(
        State(state.clone()),
        ApiForm(OutlierForm {
            column: "Reading".into(),
            method: "lof".into(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn saved_data_profiles_latest_original() {
    let state = new_state();
    let Json(empty) = data::saved_data(State(state.clone())).await.expect("saved data");
    assert!(matches!(empty, SavedDataResponse::Empty { .. }));

    upload(&state, "orders.csv", ORDERS);
    let Json(found) = data::saved_data(State(state.clone())).await.expect("saved data");
    match found {
        SavedDataResponse::Found(response) => {
            assert_eq!(response.message, "Saved data loaded successfully");
            assert_eq!(response.profile.basic_info.rows, 4);
        }
        other => panic!("expected saved data, got {other:?}"),
    }
}

#[tokio::test]
async fn sample_data_loads_working_dataset() {
    let state = new_state();
    let Json(response) = data::sample_data(State(state.clone())).await.expect("sample");
    assert_eq!(response.message, "Sample data loaded successfully");
    assert_eq!(response.profile.basic_info.rows, 100);
    assert_eq!(response.profile.preview.len(), 10);

    let Json(info) = data::data_info(State(state.clone())).await.expect("info");
    assert_eq!(info.column_info[0].name, "Date");
    assert_eq!(info.column_info[0].dtype, "datetime64[ns]");
}

#[tokio::test]
async fn registry_endpoints_round_trip() {
    let state = new_state();
    let id = register(&state, "prices", PRICES);

    let Json(tables) = lookup_tables::list_lookup_tables(State(state.clone()))
        .await
        .expect("list");
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].name, "prices");
    assert_eq!(tables[0].rows, 3);

    let Json(detail) = lookup_tables::get_lookup_table(State(state.clone()), Path(id))
        .await
        .expect("detail");
    assert_eq!(detail.basic_info.rows, 3);
    assert_eq!(detail.basic_info.columns, 3);

    let Json(deleted) = lookup_tables::delete_lookup_table(State(state.clone()), Path(id))
        .await
        .expect("delete");
    assert_eq!(deleted.message, "Lookup table deleted successfully");

    let err = lookup_tables::get_lookup_table(State(state.clone()), Path(id))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::not_found("Lookup table not found"));
}

#[tokio::test]
async fn errors_render_as_detail_json() {
    let response = ApiError::not_found("No data loaded").into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body: serde_json::Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(body, json!({ "detail": "No data loaded" }));
}

#[tokio::test]
async fn router_builds_with_default_config() {
    let _app = router(new_state());
}
