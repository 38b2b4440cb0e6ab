use rusqlite::Connection;

pub(crate) fn init(conn: &Connection) -> rusqlite::Result<()> {
    // Ensure foreign keys are enforced (disabled by default in SQLite).
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS datasets (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL,
          filename TEXT NOT NULL,
          file_size INTEGER NOT NULL DEFAULT 0,  -- kilobytes
          rows INTEGER NOT NULL,
          columns INTEGER NOT NULL,
          created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
          data_preview JSON,
          column_info JSON
        );

        CREATE INDEX IF NOT EXISTS idx_datasets_name ON datasets(name);

        CREATE TABLE IF NOT EXISTS saved_data (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          dataset_id INTEGER NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
          data_type TEXT NOT NULL CHECK (data_type IN ('original','lookup_table')),
          data_content BLOB NOT NULL,
          created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_saved_data_dataset ON saved_data(dataset_id, data_type);
        "#,
    )?;

    Ok(())
}
