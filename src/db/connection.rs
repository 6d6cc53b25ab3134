use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use rusqlite::Connection;

use crate::db::migrations;

/// Default database location inside the platform data directory.
pub fn default_db_path() -> Result<PathBuf> {
    let data_dir = crate::platform::data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
    Ok(data_dir.join("recsync.db"))
}

/// Open (or create) the record store at `path`, bringing the schema up to date.
/// Backs up an existing database before applying pending migrations.
pub fn open_db_at_path(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    debug!("Opening database at {}", path.display());
    let conn = migrations::open_and_migrate(path)?;
    let version = migrations::get_schema_version(&conn).unwrap_or(0);
    debug!("Database opened (schema version {})", version);
    Ok(conn)
}
