use crate::error::Result;
use rusqlite::Connection;

pub const SCHEMA_VERSION: i32 = 1;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS file_records (
            path            TEXT PRIMARY KEY,
            file_name       TEXT NOT NULL,
            extension       TEXT NOT NULL,
            category        TEXT NOT NULL,
            state           TEXT NOT NULL,
            discovered_at   TEXT NOT NULL,
            updated_at      TEXT NOT NULL,
            destination     TEXT,
            error           TEXT
        );

        CREATE TABLE IF NOT EXISTS installers (
            path            TEXT PRIMARY KEY,
            name            TEXT NOT NULL,
            kind            TEXT NOT NULL,
            first_seen      TEXT NOT NULL,
            used            BOOLEAN NOT NULL DEFAULT 0,
            used_at         TEXT
        );

        CREATE TABLE IF NOT EXISTS activity_log (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp           TEXT NOT NULL,
            file_name           TEXT NOT NULL,
            category            TEXT NOT NULL,
            action              TEXT NOT NULL,
            source_path         TEXT NOT NULL,
            destination_path    TEXT,
            details             TEXT
        );
        "#,
    )?;

    create_indexes(conn)?;
    set_schema_version(conn)?;

    Ok(())
}

fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_file_records_state ON file_records(state);
        CREATE INDEX IF NOT EXISTS idx_file_records_updated ON file_records(updated_at);
        CREATE INDEX IF NOT EXISTS idx_installers_used ON installers(used, first_seen);
        CREATE INDEX IF NOT EXISTS idx_activity_log_action ON activity_log(action);
        CREATE INDEX IF NOT EXISTS idx_activity_log_source ON activity_log(source_path);
        "#,
    )?;
    Ok(())
}

fn set_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_version LIMIT 1")?;
    let mut rows = stmt.query([])?;

    if let Some(row) = rows.next()? {
        Ok(Some(row.get(0)?))
    } else {
        Ok(None)
    }
}
