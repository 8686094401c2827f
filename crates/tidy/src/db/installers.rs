use crate::classify::InstallerKind;
use crate::db::{parse_db_time, to_db_time, InstallerEntry, SqliteDatabase};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use std::path::{Path, PathBuf};

pub trait InstallerDatabase {
    /// Creates the entry or overwrites an existing one for the same path.
    fn upsert_installer(&mut self, entry: &InstallerEntry) -> Result<()>;
    fn get_installer(&self, path: &Path) -> Result<Option<InstallerEntry>>;
    fn list_installers(&self) -> Result<Vec<InstallerEntry>>;
    /// Flips `used` on an unused entry. Returns false for unknown or already
    /// used paths.
    fn mark_installer_used(&mut self, path: &Path, at: DateTime<Utc>) -> Result<bool>;
    fn remove_installer(&mut self, path: &Path) -> Result<bool>;
    fn unused_installers_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<InstallerEntry>>;
}

const INSTALLER_COLUMNS: &str = "path, name, kind, first_seen, used, used_at";

fn parse_installer_row(row: &rusqlite::Row) -> rusqlite::Result<InstallerEntry> {
    Ok(InstallerEntry {
        path: PathBuf::from(row.get::<_, String>(0)?),
        name: row.get(1)?,
        kind: InstallerKind::from_str(&row.get::<_, String>(2)?)
            .unwrap_or(InstallerKind::Package),
        first_seen: parse_db_time(&row.get::<_, String>(3)?),
        used: row.get(4)?,
        used_at: row
            .get::<_, Option<String>>(5)?
            .map(|s| parse_db_time(&s)),
    })
}

impl InstallerDatabase for SqliteDatabase {
    fn upsert_installer(&mut self, entry: &InstallerEntry) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO installers (path, name, kind, first_seen, used, used_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                entry.path.to_string_lossy(),
                &entry.name,
                entry.kind.as_str(),
                to_db_time(&entry.first_seen),
                entry.used,
                entry.used_at.as_ref().map(to_db_time),
            ),
        )?;
        Ok(())
    }

    fn get_installer(&self, path: &Path) -> Result<Option<InstallerEntry>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {} FROM installers WHERE path = ?1",
            INSTALLER_COLUMNS
        ))?;
        let entry = stmt
            .query_row([path.to_string_lossy()], parse_installer_row)
            .optional()?;
        Ok(entry)
    }

    fn list_installers(&self) -> Result<Vec<InstallerEntry>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {} FROM installers ORDER BY first_seen",
            INSTALLER_COLUMNS
        ))?;
        let entries = stmt
            .query_map([], parse_installer_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn mark_installer_used(&mut self, path: &Path, at: DateTime<Utc>) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE installers SET used = 1, used_at = ?1 WHERE path = ?2 AND used = 0",
            (to_db_time(&at), path.to_string_lossy()),
        )?;
        Ok(rows > 0)
    }

    fn remove_installer(&mut self, path: &Path) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM installers WHERE path = ?1", [path.to_string_lossy()])?;
        Ok(rows > 0)
    }

    fn unused_installers_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<InstallerEntry>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {} FROM installers WHERE used = 0 AND first_seen < ?1 ORDER BY first_seen",
            INSTALLER_COLUMNS
        ))?;
        let entries = stmt
            .query_map([to_db_time(&cutoff)], parse_installer_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
