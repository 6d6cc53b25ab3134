//! Schema inspection helpers.
//!
//! Versioning lives in the migrations module; this module exposes the version
//! and builds in-memory test databases from the same SQL.

use anyhow::Result;
use rusqlite::Connection;

use crate::db::migrations;

pub fn get_schema_version(conn: &Connection) -> Result<usize> {
    migrations::get_schema_version(conn)
}

/// Creates all tables in an in-memory database for testing.
#[cfg(test)]
pub fn create_tables(conn: &Connection) -> Result<()> {
    for sql in migrations::MIGRATION_SQL {
        conn.execute_batch(sql)?;
    }
    Ok(())
}

/// Fresh in-memory store with the full schema.
#[cfg(test)]
pub fn test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    create_tables(&conn).unwrap();
    conn
}
