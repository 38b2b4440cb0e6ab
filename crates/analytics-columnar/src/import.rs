use std::collections::HashMap;
use std::io::{Cursor, Read};

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ByteRecord;
use encoding_rs::WINDOWS_1252;
use thiserror::Error;

use crate::parse::{parse_number, parse_timestamp_millis, DateOrder};
use crate::table::{Column, Dataset, DatasetBuilder, DatasetError};
use crate::types::{ColumnType, Value};

/// Tokens treated as missing values, matching common dataframe readers.
pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// Days between the Excel 1900 epoch (serial 0 = 1899-12-30) and 1970-01-01.
const EXCEL_UNIX_EPOCH_OFFSET_DAYS: f64 = 25_569.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Clone, Debug)]
pub struct CsvOptions {
    pub delimiter: u8,
    /// Number of leading data rows used for column type inference.
    pub sample_rows: usize,
    /// How to decode raw CSV bytes into text fields.
    pub encoding: CsvTextEncoding,
    /// Preferred order for ambiguous numeric dates like `01/02/2024`.
    pub date_order: DateOrder,
    /// Detect timestamp columns; when false such columns stay textual.
    pub infer_timestamps: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            sample_rows: 1_000,
            encoding: CsvTextEncoding::Auto,
            date_order: DateOrder::default(),
            infer_timestamps: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsvTextEncoding {
    /// Attempt to decode as UTF-8; if a field contains invalid UTF-8, fall back to Windows-1252.
    ///
    /// This matches common Excel behavior when opening CSV files on Windows.
    Auto,
    /// Decode as UTF-8 and reject invalid byte sequences.
    Utf8,
    /// Decode as Windows-1252 (aka CP-1252).
    Windows1252,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("file is empty")]
    EmptyInput,
    #[error("file contains no data")]
    NoRows,
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("csv parse error at row {row}, column {column}: {reason}")]
    Parse { row: u64, column: u64, reason: String },
    #[error("error reading workbook: {0}")]
    Workbook(String),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Excel,
}

impl FileFormat {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_ascii_lowercase();
        let ext = lower.rsplit_once('.').map(|(_, ext)| ext)?;
        match ext {
            "csv" => Some(FileFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(FileFormat::Excel),
            _ => None,
        }
    }
}

/// Parse an uploaded file, dispatching on its extension.
pub fn import_file(filename: &str, bytes: &[u8]) -> Result<Dataset, ImportError> {
    if bytes.is_empty() {
        return Err(ImportError::EmptyInput);
    }
    let format = FileFormat::from_filename(filename)
        .ok_or_else(|| ImportError::UnsupportedFormat(filename.to_string()))?;

    let dataset = match format {
        FileFormat::Csv => import_csv(bytes, &CsvOptions::default())?,
        FileFormat::Excel => import_excel(bytes)?,
    };
    log::debug!(
        "imported {filename}: {} rows x {} columns",
        dataset.row_count(),
        dataset.column_count()
    );
    Ok(dataset)
}

/// Import a CSV stream with a header row into a [`Dataset`].
///
/// Column types are inferred from the first `sample_rows` data rows. A later
/// field that does not parse as the sampled type widens the column by
/// re-inferring over every row, so no cell is silently dropped.
pub fn import_csv<R: Read>(reader: R, options: &CsvOptions) -> Result<Dataset, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let decoder = FieldDecoder {
        encoding: options.encoding,
    };

    let mut records = csv_reader.byte_records();
    let header = match records.next() {
        Some(record) => record.map_err(|e| csv_error(e, 1))?,
        None => return Err(ImportError::EmptyInput),
    };
    let mut header_names = decoder.decode_row(&header, 1)?;
    let mut column_count = header_names.len();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (offset, record) in records.enumerate() {
        let line = offset as u64 + 2;
        let record = record.map_err(|e| csv_error(e, line))?;
        let row = decoder.decode_row(&record, line)?;
        if row.iter().all(|f| f.is_empty()) {
            continue;
        }
        column_count = column_count.max(row.len());
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(ImportError::NoRows);
    }

    if header_names.len() < column_count {
        let start = header_names.len();
        header_names.extend((start..column_count).map(|i| format!("Unnamed: {i}")));
    }
    let header_names = dedupe_headers(header_names);

    let sample_len = rows.len().min(options.sample_rows.max(1));
    let (sample, rest) = rows.split_at(sample_len);
    let column_types: Vec<ColumnType> = (0..column_count)
        .map(|col| {
            let sampled = infer_column_type(sample.iter().map(|r| field(r, col)), options);
            match rest
                .iter()
                .position(|r| !accepts(sampled, field(r, col), options))
            {
                None => sampled,
                Some(idx) => {
                    let widened = infer_column_type(rows.iter().map(|r| field(r, col)), options);
                    log::debug!(
                        "column {col}: row {} does not parse as {sampled:?}; widening to {widened:?}",
                        sample_len + idx + 1
                    );
                    widened
                }
            }
        })
        .collect();

    let columns = header_names
        .into_iter()
        .zip(column_types)
        .enumerate()
        .map(|(col, (name, column_type))| {
            let values = rows
                .iter()
                .map(|r| parse_typed_value(field(r, col), column_type, options))
                .collect();
            Column::new(name, column_type, values)
        })
        .collect();

    Ok(Dataset::new(columns)?)
}

/// Import the first worksheet of an Excel/ODS workbook; the first row is the header.
pub fn import_excel(bytes: &[u8]) -> Result<Dataset, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ImportError::Workbook(e.to_string()))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ImportError::EmptyInput)?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ImportError::Workbook(e.to_string()))?;

    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        return Err(ImportError::EmptyInput);
    };
    let header_names: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell {
            Data::Empty => format!("Unnamed: {i}"),
            Data::Float(f) => crate::types::format_number(*f),
            other => other.to_string(),
        })
        .collect();
    let width = header_names.len();

    let mut builder = DatasetBuilder::new(dedupe_headers(header_names));
    for row in sheet_rows {
        let values: Vec<Value> = (0..width)
            .map(|i| row.get(i).map(excel_cell_to_value).unwrap_or_default())
            .collect();
        if values.iter().all(Value::is_missing) {
            continue;
        }
        builder.push_row(values)?;
    }

    if builder.is_empty() {
        return Err(ImportError::NoRows);
    }
    Ok(builder.finish()?)
}

fn excel_cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Missing,
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) => Value::number(*f),
        Data::DateTime(dt) => {
            let millis = (dt.as_f64() - EXCEL_UNIX_EPOCH_OFFSET_DAYS) * MILLIS_PER_DAY;
            Value::Timestamp(millis.round() as i64)
        }
        Data::DateTimeIso(s) => parse_timestamp_millis(s, DateOrder::default())
            .map(Value::Timestamp)
            .unwrap_or_else(|| Value::Text(s.clone())),
        Data::Bool(b) => Value::Text(if *b { "True" } else { "False" }.to_string()),
        Data::String(s) if MISSING_MARKERS.contains(&s.trim()) => Value::Missing,
        other => Value::Text(other.to_string()),
    }
}

fn field(row: &[String], col: usize) -> &str {
    row.get(col).map(|s| s.as_str()).unwrap_or("")
}

fn is_missing_marker(field: &str) -> bool {
    MISSING_MARKERS.contains(&field.trim())
}

fn infer_column_type<'a>(
    fields: impl Iterator<Item = &'a str>,
    options: &CsvOptions,
) -> ColumnType {
    let mut is_number = true;
    let mut is_timestamp = options.infer_timestamps;
    let mut saw_value = false;

    for v in fields {
        if is_missing_marker(v) {
            continue;
        }
        saw_value = true;
        if is_number && parse_number(v).is_none() {
            is_number = false;
        }
        if is_timestamp && parse_timestamp_millis(v, options.date_order).is_none() {
            is_timestamp = false;
        }
        if !is_number && !is_timestamp {
            break;
        }
    }

    if !saw_value || is_number {
        ColumnType::Number
    } else if is_timestamp {
        ColumnType::Timestamp
    } else {
        ColumnType::Text
    }
}

/// Whether `field` parses as a value of `column_type`. Missing markers fit any type.
fn accepts(column_type: ColumnType, field: &str, options: &CsvOptions) -> bool {
    if is_missing_marker(field) {
        return true;
    }
    match column_type {
        ColumnType::Number => parse_number(field).is_some(),
        ColumnType::Timestamp => parse_timestamp_millis(field, options.date_order).is_some(),
        _ => true,
    }
}

fn parse_typed_value(field: &str, column_type: ColumnType, options: &CsvOptions) -> Value {
    if is_missing_marker(field) {
        return Value::Missing;
    }

    match column_type {
        ColumnType::Number => parse_number(field).map(Value::number).unwrap_or_default(),
        ColumnType::Timestamp => parse_timestamp_millis(field, options.date_order)
            .map(Value::Timestamp)
            .unwrap_or_default(),
        _ => Value::Text(field.to_string()),
    }
}

/// Disambiguate repeated header names with `.1`, `.2`, ... suffixes.
fn dedupe_headers(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = name.clone();
        while let Some(count) = seen.get_mut(&candidate) {
            *count += 1;
            candidate = format!("{name}.{}", *count - 1);
            if !seen.contains_key(&candidate) {
                break;
            }
        }
        seen.insert(candidate.clone(), 1);
        out.push(candidate);
    }
    out
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Turns raw CSV byte records into owned text fields.
struct FieldDecoder {
    encoding: CsvTextEncoding,
}

impl FieldDecoder {
    /// Decode every field of the record on 1-based `line`.
    fn decode_row(&self, record: &ByteRecord, line: u64) -> Result<Vec<String>, ImportError> {
        record
            .iter()
            .enumerate()
            .map(|(idx, raw)| {
                // Spreadsheet exports often open with a byte order mark.
                let raw = match (line, idx) {
                    (1, 0) => raw.strip_prefix(UTF8_BOM).unwrap_or(raw),
                    _ => raw,
                };
                self.decode(raw).map_err(|reason| ImportError::Parse {
                    row: line,
                    column: idx as u64 + 1,
                    reason,
                })
            })
            .collect()
    }

    fn decode(&self, raw: &[u8]) -> Result<String, String> {
        match (self.encoding, std::str::from_utf8(raw)) {
            (CsvTextEncoding::Windows1252, _) | (CsvTextEncoding::Auto, Err(_)) => {
                Ok(WINDOWS_1252.decode(raw).0.into_owned())
            }
            (_, Ok(text)) => Ok(text.to_string()),
            (CsvTextEncoding::Utf8, Err(e)) => Err(format!("invalid UTF-8: {e}")),
        }
    }
}

fn csv_error(err: csv::Error, line: u64) -> ImportError {
    let row = err
        .position()
        .map(csv::Position::record)
        .filter(|&record| record > 0)
        .unwrap_or(line);
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(io) => ImportError::Io(io),
        _ => ImportError::Parse {
            row,
            column: 0,
            reason,
        },
    }
}
