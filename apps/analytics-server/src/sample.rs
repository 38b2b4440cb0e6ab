//! Deterministic demo dataset served by `/sample-data`.

use analytics_columnar::{Column, ColumnType, Dataset, DatasetError, Value};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng as _};
use std::f64::consts::PI;

pub const SAMPLE_ROWS: usize = 100;
pub const SAMPLE_SEED: u64 = 42;

const PRODUCTS: &[&str] = &["Laptop", "Phone", "Tablet", "Monitor", "Keyboard"];
const REGIONS: &[&str] = &["North", "South", "East", "West"];

/// One hundred days of synthetic sales with a trend, a 30-day season, noise
/// and a few missing values.
pub fn sales_dataset() -> Result<Dataset, DatasetError> {
    let mut rng = StdRng::seed_from_u64(SAMPLE_SEED);
    let start = NaiveDate::from_ymd_opt(2023, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .unwrap_or_default();

    let mut dates = Vec::with_capacity(SAMPLE_ROWS);
    let mut products = Vec::with_capacity(SAMPLE_ROWS);
    let mut regions = Vec::with_capacity(SAMPLE_ROWS);
    let mut units = Vec::with_capacity(SAMPLE_ROWS);
    let mut prices = Vec::with_capacity(SAMPLE_ROWS);
    let mut totals = Vec::with_capacity(SAMPLE_ROWS);
    let mut satisfaction = Vec::with_capacity(SAMPLE_ROWS);

    for i in 0..SAMPLE_ROWS {
        let day = i as f64;
        let trend = 1.0 + (day / SAMPLE_ROWS as f64) * 0.5;
        let season = 1.0 + 0.3 * (day * 2.0 * PI / 30.0).sin();
        let sold = (50.0 * trend * season + normal(&mut rng, 10.0)).trunc();
        let sold = sold.clamp(10.0, 150.0);
        let sold = (!rng.gen_bool(0.05)).then_some(sold);

        let price = (100.0 + 50.0 * (day * PI / 20.0).sin() + normal(&mut rng, 15.0)).clamp(20.0, 300.0);
        let rating = (!rng.gen_bool(0.03)).then(|| f64::from(rng.gen_range(1..=5)));

        dates.push(Value::Timestamp((start + Duration::days(i as i64)).timestamp_millis()));
        products.push(pick(&mut rng, PRODUCTS));
        regions.push(pick(&mut rng, REGIONS));
        units.push(Value::from(sold));
        prices.push(Value::number(round2(price)));
        totals.push(Value::from(sold.map(|s| round2(s * price))));
        satisfaction.push(Value::from(rating));
    }

    Dataset::new(vec![
        Column::new("Date", ColumnType::Timestamp, dates),
        Column::new("Product", ColumnType::Text, products),
        Column::new("Region", ColumnType::Text, regions),
        Column::new("Units_Sold", ColumnType::Number, units),
        Column::new("Unit_Price", ColumnType::Number, prices),
        Column::new("Total_Sales", ColumnType::Number, totals),
        Column::new("Customer_Satisfaction", ColumnType::Number, satisfaction),
    ])
}

fn pick(rng: &mut StdRng, choices: &[&str]) -> Value {
    choices
        .choose(rng)
        .map(|c| Value::from(*c))
        .unwrap_or_default()
}

fn normal(rng: &mut StdRng, std_dev: f64) -> f64 {
    // Box-Muller transform.
    let u1 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2 = rng.gen::<f64>();
    let r = (-2.0 * u1.ln()).sqrt();
    std_dev * r * (2.0 * PI * u2).cos()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
