use crate::classify::Category;
use crate::db::{parse_db_time, to_db_time, ActivityEntry, LogAction, SqliteDatabase};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

/// Oldest entries beyond this are trimmed on append.
pub const MAX_LOG_ENTRIES: i64 = 1000;

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub action: Option<LogAction>,
    pub source_path: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

/// Append-only activity log. Entries come back newest first.
pub trait ActivityDatabase {
    fn append_log(&mut self, entry: &ActivityEntry) -> Result<i64>;
    fn query_log(&self, filter: &ActivityFilter) -> Result<Vec<ActivityEntry>>;
    fn get_log(&self, id: i64) -> Result<Option<ActivityEntry>>;
    fn remove_log(&mut self, id: i64) -> Result<bool>;
    fn clear_log(&mut self) -> Result<usize>;
}

const LOG_COLUMNS: &str =
    "id, timestamp, file_name, category, action, source_path, destination_path, details";

fn parse_log_row(row: &rusqlite::Row) -> rusqlite::Result<ActivityEntry> {
    Ok(ActivityEntry {
        id: row.get(0)?,
        timestamp: parse_db_time(&row.get::<_, String>(1)?),
        file_name: row.get(2)?,
        category: Category::from_str(&row.get::<_, String>(3)?).unwrap_or(Category::Misc),
        action: LogAction::from_str(&row.get::<_, String>(4)?).unwrap_or(LogAction::Error),
        source_path: row.get(5)?,
        destination_path: row.get(6)?,
        details: row.get(7)?,
    })
}

impl ActivityDatabase for SqliteDatabase {
    fn append_log(&mut self, entry: &ActivityEntry) -> Result<i64> {
        let conn = self.conn_mut();
        conn.execute(
            "INSERT INTO activity_log (timestamp, file_name, category, action, source_path,
                                       destination_path, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (
                to_db_time(&entry.timestamp),
                &entry.file_name,
                entry.category.as_str(),
                entry.action.as_str(),
                &entry.source_path,
                &entry.destination_path,
                &entry.details,
            ),
        )?;
        let id = conn.last_insert_rowid();

        conn.execute(
            "DELETE FROM activity_log WHERE id NOT IN (
                SELECT id FROM activity_log ORDER BY id DESC LIMIT ?1
            )",
            [MAX_LOG_ENTRIES],
        )?;

        Ok(id)
    }

    fn query_log(&self, filter: &ActivityFilter) -> Result<Vec<ActivityEntry>> {
        let conn = self.conn();
        let mut query = format!("SELECT {} FROM activity_log WHERE 1=1", LOG_COLUMNS);

        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(action) = &filter.action {
            query.push_str(" AND action = ?");
            params.push(Box::new(action.as_str()));
        }

        if let Some(source) = &filter.source_path {
            query.push_str(" AND source_path = ?");
            params.push(Box::new(source.clone()));
        }

        if let Some(since) = &filter.since {
            query.push_str(" AND timestamp > ?");
            params.push(Box::new(to_db_time(since)));
        }

        query.push_str(" ORDER BY id DESC");

        if let Some(lim) = filter.limit {
            query.push_str(" LIMIT ?");
            params.push(Box::new(lim));
        }

        let mut stmt = conn.prepare(&query)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let entries = stmt
            .query_map(&param_refs[..], parse_log_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn get_log(&self, id: i64) -> Result<Option<ActivityEntry>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {} FROM activity_log WHERE id = ?1", LOG_COLUMNS))?;
        let entry = stmt.query_row([id], parse_log_row).optional()?;
        Ok(entry)
    }

    fn remove_log(&mut self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM activity_log WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    fn clear_log(&mut self) -> Result<usize> {
        let rows = self.conn().execute("DELETE FROM activity_log", [])?;
        Ok(rows)
    }
}
