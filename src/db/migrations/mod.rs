//! Schema versioning for the record store using rusqlite_migration.
//!
//! Migrations are embedded SQL files applied in order. The `user_version`
//! pragma records how many have run.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use rusqlite_migration::{Migrations, SchemaVersion, M};

/// Migration scripts, in order. Index N brings the schema from version N to N+1.
pub(crate) const MIGRATION_SQL: &[&str] = &[
    include_str!("v001_initial_schema.sql"),
    include_str!("v002_status_indexes.sql"),
];

fn migrations() -> Migrations<'static> {
    Migrations::new(MIGRATION_SQL.iter().map(|sql| M::up(*sql)).collect())
}

/// Open the database, running any pending migrations.
/// Backs up the database first if it already exists and is behind.
pub fn open_and_migrate(db_path: &Path) -> Result<Connection> {
    let db_exists = db_path.exists();

    let mut conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    let m = migrations();
    let current_version = m
        .current_version(&conn)
        .context("Failed to check current schema version")?;

    let needs_migration = match current_version {
        SchemaVersion::NoneSet => true,
        SchemaVersion::Inside(v) => v.get() < MIGRATION_SQL.len(),
        SchemaVersion::Outside(_) => false,
    };

    if needs_migration && db_exists && !matches!(current_version, SchemaVersion::NoneSet) {
        backup_database(db_path)?;
        eprintln!("[recsync] Applying database migration(s)...");
    } else if needs_migration && !db_exists {
        eprintln!("[recsync] Creating new database at {}", db_path.display());
    }

    m.to_latest(&mut conn)
        .context("Failed to apply database migrations")?;

    Ok(conn)
}

/// Current schema version (0 for an empty database).
pub fn get_schema_version(conn: &Connection) -> Result<usize> {
    let version = migrations()
        .current_version(conn)
        .context("Failed to get schema version")?;

    Ok(match version {
        SchemaVersion::NoneSet => 0,
        SchemaVersion::Inside(v) | SchemaVersion::Outside(v) => v.get(),
    })
}

fn backup_database(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        return Ok(());
    }

    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
    let backup_path = db_path.with_extension(format!("db.backup.{}", timestamp));

    std::fs::copy(db_path, &backup_path)
        .with_context(|| format!("Failed to backup database to {}", backup_path.display()))?;

    eprintln!("[recsync] Backed up database to {}", backup_path.display());
    Ok(())
}
