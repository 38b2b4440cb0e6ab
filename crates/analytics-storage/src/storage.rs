use crate::schema;
use crate::types::{DataType, DatasetMeta, LookupTableSummary, NewDataset};
use analytics_columnar::Dataset;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Lookup table not found")]
    LookupTableNotFound(i64),
    #[error("Lookup table data not found")]
    LookupTableDataMissing(i64),
}

pub type Result<T> = std::result::Result<T, StorageError>;

const DATASET_COLUMNS: &str = "id, name, filename, file_size, rows, columns, created_at";

#[derive(Debug, Clone)]
pub struct Storage {
    conn: Arc<Mutex<Connection>>,
}

impl Storage {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    pub fn open_uri(uri: &str) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI;
        let conn = Connection::open_with_flags(uri, flags)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Persist metadata and the serialized dataset in one transaction.
    pub fn save_dataset(&self, new: NewDataset<'_>) -> Result<DatasetMeta> {
        let payload = serde_json::to_vec(new.dataset)?;
        let preview = serde_json::to_value(&new.profile.preview)?;
        let column_info = serde_json::to_value(&new.profile.column_info)?;
        let file_size_kb = (new.dataset.estimated_size_bytes() / 1024) as i64;

        let mut conn = self.conn.lock().expect("storage mutex poisoned");
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO datasets (name, filename, file_size, rows, columns, data_preview, column_info)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                new.name,
                new.filename,
                file_size_kb,
                new.dataset.row_count() as i64,
                new.dataset.column_count() as i64,
                preview,
                column_info,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO saved_data (dataset_id, data_type, data_content) VALUES (?1, ?2, ?3)",
            params![id, new.data_type.as_str(), payload],
        )?;
        let meta = tx.query_row(
            &format!("SELECT {DATASET_COLUMNS} FROM datasets WHERE id = ?1"),
            params![id],
            dataset_meta_from_row,
        )?;
        tx.commit()?;

        log::info!(
            "saved {} dataset {id} ({}, {} rows)",
            new.data_type.as_str(),
            new.name,
            meta.rows
        );
        Ok(meta)
    }

    pub fn list_lookup_tables(&self) -> Result<Vec<LookupTableSummary>> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let mut stmt = conn.prepare(
            r#"
            SELECT d.id, d.name, d.rows, d.columns, d.column_info, d.data_preview
            FROM datasets d
            WHERE EXISTS (
              SELECT 1 FROM saved_data s
              WHERE s.dataset_id = d.id AND s.data_type = 'lookup_table'
            )
            ORDER BY d.id
            "#,
        )?;
        let rows = stmt.query_map([], summary_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Registry entry for `id`; fails when the id is unknown or has no lookup payload.
    pub fn lookup_table_summary(&self, id: i64) -> Result<LookupTableSummary> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let summary = conn
            .query_row(
                r#"
                SELECT id, name, rows, columns, column_info, data_preview
                FROM datasets WHERE id = ?1
                "#,
                params![id],
                summary_from_row,
            )
            .optional()?
            .ok_or(StorageError::LookupTableNotFound(id))?;

        if !has_payload(&conn, id, DataType::LookupTable)? {
            return Err(StorageError::LookupTableDataMissing(id));
        }
        Ok(summary)
    }

    pub fn load_lookup_table(&self, id: i64) -> Result<Dataset> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let exists: Option<i64> = conn
            .query_row("SELECT id FROM datasets WHERE id = ?1", params![id], |r| r.get(0))
            .optional()?;
        if exists.is_none() {
            return Err(StorageError::LookupTableNotFound(id));
        }

        let payload = load_payload(&conn, id, DataType::LookupTable)?
            .ok_or(StorageError::LookupTableDataMissing(id))?;
        Ok(serde_json::from_slice(&payload)?)
    }

    /// Remove a dataset row and (by cascade) its payloads.
    pub fn delete_lookup_table(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let deleted = conn.execute("DELETE FROM datasets WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StorageError::LookupTableNotFound(id));
        }
        log::info!("deleted lookup table {id}");
        Ok(())
    }

    /// The most recently saved dataset, if it was saved as an original upload.
    pub fn latest_original(&self) -> Result<Option<(DatasetMeta, Dataset)>> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let meta = conn
            .query_row(
                &format!(
                    "SELECT {DATASET_COLUMNS} FROM datasets ORDER BY created_at DESC, id DESC LIMIT 1"
                ),
                [],
                dataset_meta_from_row,
            )
            .optional()?;
        let Some(meta) = meta else {
            return Ok(None);
        };

        match load_payload(&conn, meta.id, DataType::Original)? {
            Some(payload) => Ok(Some((meta, serde_json::from_slice(&payload)?))),
            None => Ok(None),
        }
    }
}

fn has_payload(conn: &Connection, dataset_id: i64, data_type: DataType) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM saved_data WHERE dataset_id = ?1 AND data_type = ?2 LIMIT 1",
            params![dataset_id, data_type.as_str()],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn load_payload(conn: &Connection, dataset_id: i64, data_type: DataType) -> Result<Option<Vec<u8>>> {
    Ok(conn
        .query_row(
            r#"
            SELECT data_content FROM saved_data
            WHERE dataset_id = ?1 AND data_type = ?2
            ORDER BY id LIMIT 1
            "#,
            params![dataset_id, data_type.as_str()],
            |r| r.get(0),
        )
        .optional()?)
}

fn dataset_meta_from_row(r: &Row<'_>) -> rusqlite::Result<DatasetMeta> {
    Ok(DatasetMeta {
        id: r.get(0)?,
        name: r.get(1)?,
        filename: r.get(2)?,
        file_size: r.get(3)?,
        rows: r.get(4)?,
        columns: r.get(5)?,
        created_at: r.get(6)?,
    })
}

fn summary_from_row(r: &Row<'_>) -> rusqlite::Result<LookupTableSummary> {
    let column_info: Option<serde_json::Value> = r.get(4)?;
    let preview: Option<serde_json::Value> = r.get(5)?;
    Ok(LookupTableSummary {
        id: r.get(0)?,
        name: r.get(1)?,
        rows: r.get(2)?,
        columns: r.get(3)?,
        column_info: column_info.unwrap_or_else(|| serde_json::json!([])),
        preview: preview.unwrap_or_else(|| serde_json::json!([])),
    })
}
