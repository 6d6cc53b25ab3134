use std::path::Path;

use anyhow::Result;

use crate::cli::args::DbAction;
use crate::db::connection::open_db_at_path;
use crate::db::info::get_info;
use crate::output::format::OutputMode;
use crate::output::json::to_json;
use crate::output::table::format_db_info;

pub fn run_with_path(action: &DbAction, db_path: &Path, mode: OutputMode) -> Result<()> {
    match action {
        DbAction::Clear => clear_database(db_path),
        DbAction::Info => show_database_info(db_path, mode),
    }
}

fn clear_database(db_path: &Path) -> Result<()> {
    if db_path.exists() {
        std::fs::remove_file(db_path)?;
        println!("Cleared database: {}", db_path.display());
    } else {
        println!("No database found at {}", db_path.display());
    }
    Ok(())
}

fn show_database_info(db_path: &Path, mode: OutputMode) -> Result<()> {
    if !db_path.exists() {
        match mode {
            OutputMode::Json => println!("{}", serde_json::json!({ "db_path": db_path, "exists": false })),
            OutputMode::Tty => {
                println!("Database path: {}", db_path.display());
                println!("Status: does not exist (run 'recsync ingest' to create)");
            }
        }
        return Ok(());
    }

    let conn = open_db_at_path(db_path)?;
    let info = get_info(&conn, db_path)?;
    match mode {
        OutputMode::Json => println!("{}", to_json(&info)),
        OutputMode::Tty => println!("{}", format_db_info(&info)),
    }
    Ok(())
}
