use rusqlite::{Connection, Result};

/// Initialize the shared media index schema
pub fn init_media_schema(conn: &Connection) -> Result<()> {
    // Schema version table for the media index
    conn.execute(
        "CREATE TABLE IF NOT EXISTS media_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT version FROM media_schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current_version < 1 {
        create_media_schema_v1(conn)?;
        conn.execute("INSERT INTO media_schema_version (version) VALUES (1)", [])?;
    }

    Ok(())
}

/// Create media schema version 1
fn create_media_schema_v1(conn: &Connection) -> Result<()> {
    // AUTOINCREMENT keeps ids strictly increasing, even after deletes
    conn.execute(
        "CREATE TABLE IF NOT EXISTS images (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            volume TEXT NOT NULL,
            display_name TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            width INTEGER NOT NULL DEFAULT 0,
            height INTEGER NOT NULL DEFAULT 0,
            size INTEGER NOT NULL DEFAULT 0,
            is_pending INTEGER NOT NULL DEFAULT 1 CHECK(is_pending IN (0,1)),
            date_added INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_images_volume ON images(volume, is_pending)",
        [],
    )?;

    Ok(())
}
