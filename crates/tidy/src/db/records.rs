use crate::classify::Category;
use crate::db::{parse_db_time, to_db_time, FileRecord, RecordState, SqliteDatabase};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::{named_params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// Narrows a registry query. Empty filters match every record.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub states: Vec<RecordState>,
    pub updated_since: Option<DateTime<Utc>>,
    pub category: Option<Category>,
}

impl RecordFilter {
    pub fn state(state: RecordState) -> Self {
        Self {
            states: vec![state],
            ..Default::default()
        }
    }

    pub fn any_of(states: &[RecordState]) -> Self {
        Self {
            states: states.to_vec(),
            ..Default::default()
        }
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.updated_since = Some(since);
        self
    }
}

pub trait RegistryDatabase {
    fn get_record(&self, path: &Path) -> Result<Option<FileRecord>>;
    /// Inserts or replaces the record for `record.path`.
    fn put_record(&mut self, record: &FileRecord) -> Result<()>;
    /// Inserts `record` unless the existing record for the path is in a
    /// state that blocks pending. Returns whether a row was written.
    fn insert_pending_if_absent(&mut self, record: &FileRecord) -> Result<bool>;
    fn delete_record(&mut self, path: &Path) -> Result<bool>;
    fn delete_records_in_state(&mut self, state: RecordState) -> Result<usize>;
    fn query_records(&self, filter: &RecordFilter) -> Result<Vec<FileRecord>>;
    fn count_records(&self, state: RecordState) -> Result<usize>;
}

const RECORD_COLUMNS: &str = "path, file_name, extension, category, state, discovered_at, \
                              updated_at, destination, error";

pub fn get_record(conn: &Connection, path: &Path) -> Result<Option<FileRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM file_records WHERE path = ?1",
        RECORD_COLUMNS
    ))?;
    let record = stmt
        .query_row([path.to_string_lossy()], parse_record_row)
        .optional()?;
    Ok(record)
}

pub fn put_record(conn: &Connection, record: &FileRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO file_records (
            path, file_name, extension, category, state, discovered_at, updated_at,
            destination, error
        ) VALUES (
            :path, :file_name, :extension, :category, :state, :discovered_at, :updated_at,
            :destination, :error
        )",
        named_params! {
            ":path": record.path.to_string_lossy(),
            ":file_name": &record.file_name,
            ":extension": &record.extension,
            ":category": record.category.as_str(),
            ":state": record.state.as_str(),
            ":discovered_at": to_db_time(&record.discovered_at),
            ":updated_at": to_db_time(&record.updated_at),
            ":destination": record.destination.as_ref().map(|p| p.to_string_lossy().to_string()),
            ":error": &record.error,
        },
    )?;
    Ok(())
}

pub fn insert_pending_if_absent(conn: &Connection, record: &FileRecord) -> Result<bool> {
    let changed = conn.execute(
        "INSERT INTO file_records (
            path, file_name, extension, category, state, discovered_at, updated_at,
            destination, error
        ) VALUES (
            :path, :file_name, :extension, :category, :state, :discovered_at, :updated_at,
            NULL, NULL
        )
        ON CONFLICT(path) DO UPDATE SET
            file_name = excluded.file_name,
            extension = excluded.extension,
            category = excluded.category,
            state = excluded.state,
            updated_at = excluded.updated_at,
            destination = NULL,
            error = NULL
        WHERE file_records.state NOT IN ('pending', 'moved', 'tracked')",
        named_params! {
            ":path": record.path.to_string_lossy(),
            ":file_name": &record.file_name,
            ":extension": &record.extension,
            ":category": record.category.as_str(),
            ":state": record.state.as_str(),
            ":discovered_at": to_db_time(&record.discovered_at),
            ":updated_at": to_db_time(&record.updated_at),
        },
    )?;
    Ok(changed > 0)
}

pub fn query_records(conn: &Connection, filter: &RecordFilter) -> Result<Vec<FileRecord>> {
    let mut query = format!("SELECT {} FROM file_records WHERE 1=1", RECORD_COLUMNS);
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if !filter.states.is_empty() {
        let placeholders = vec!["?"; filter.states.len()].join(", ");
        query.push_str(&format!(" AND state IN ({})", placeholders));
        for state in &filter.states {
            params.push(Box::new(state.as_str()));
        }
    }

    if let Some(since) = &filter.updated_since {
        query.push_str(" AND updated_at > ?");
        params.push(Box::new(to_db_time(since)));
    }

    if let Some(category) = &filter.category {
        query.push_str(" AND category = ?");
        params.push(Box::new(category.as_str()));
    }

    query.push_str(" ORDER BY updated_at DESC");

    let mut stmt = conn.prepare(&query)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let records = stmt
        .query_map(&param_refs[..], parse_record_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(records)
}

fn parse_record_row(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        path: PathBuf::from(row.get::<_, String>(0)?),
        file_name: row.get(1)?,
        extension: row.get(2)?,
        category: Category::from_str(&row.get::<_, String>(3)?).unwrap_or(Category::Misc),
        state: RecordState::from_str(&row.get::<_, String>(4)?).unwrap_or(RecordState::Error),
        discovered_at: parse_db_time(&row.get::<_, String>(5)?),
        updated_at: parse_db_time(&row.get::<_, String>(6)?),
        destination: row.get::<_, Option<String>>(7)?.map(PathBuf::from),
        error: row.get(8)?,
    })
}

impl RegistryDatabase for SqliteDatabase {
    fn get_record(&self, path: &Path) -> Result<Option<FileRecord>> {
        get_record(self.conn(), path)
    }

    fn put_record(&mut self, record: &FileRecord) -> Result<()> {
        put_record(self.conn(), record)
    }

    fn insert_pending_if_absent(&mut self, record: &FileRecord) -> Result<bool> {
        insert_pending_if_absent(self.conn(), record)
    }

    fn delete_record(&mut self, path: &Path) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM file_records WHERE path = ?1",
            [path.to_string_lossy()],
        )?;
        Ok(rows > 0)
    }

    fn delete_records_in_state(&mut self, state: RecordState) -> Result<usize> {
        let rows = self
            .conn()
            .execute("DELETE FROM file_records WHERE state = ?1", [state.as_str()])?;
        Ok(rows)
    }

    fn query_records(&self, filter: &RecordFilter) -> Result<Vec<FileRecord>> {
        query_records(self.conn(), filter)
    }

    fn count_records(&self, state: RecordState) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM file_records WHERE state = ?1",
            [state.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
