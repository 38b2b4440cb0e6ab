use crate::table::Dataset;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("csv output is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("failed to flush csv output: {0}")]
    Flush(String),
}

/// Render `dataset` as CSV: a header row, then one record per row using each
/// value's display form (missing cells are empty).
pub fn export_csv(dataset: &Dataset) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(dataset.column_names())?;
    for row in 0..dataset.row_count() {
        writer.write_record(
            dataset
                .columns()
                .map(|c| c.get(row).map(ToString::to_string).unwrap_or_default()),
        )?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Flush(err.error().to_string()))?;
    Ok(String::from_utf8(bytes)?)
}
