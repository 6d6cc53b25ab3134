use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::Config;
use crate::output::format::{OutputMode, detect_output_mode};

/// Everything a command needs from the command line and the config file.
pub struct RunContext {
    pub output_mode: OutputMode,
    pub config: Config,
}

impl RunContext {
    pub fn from_args(
        json: bool,
        no_color: bool,
        config_path: Option<&Path>,
        db_override: Option<&Path>,
        dry_run_override: Option<bool>,
    ) -> Result<Self> {
        if no_color {
            colored::control::set_override(false);
        }

        let mut config = Config::load(config_path).context("Failed to load configuration")?;
        if let Some(db) = db_override {
            config.client.db_location = Some(db.to_path_buf());
        }
        if let Some(dry_run) = dry_run_override {
            config.client.dry_run = dry_run;
        }

        Ok(RunContext {
            output_mode: detect_output_mode(json),
            config,
        })
    }

    /// Configured database path, or the default in the data directory.
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.config.client.db_location {
            Some(path) => Ok(path.clone()),
            None => crate::db::connection::default_db_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_cli_overrides_config() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[client]\ndb_location = \"/from/file.db\"\ndry_run = true\n");

        let ctx = RunContext::from_args(true, false, Some(&path), Some(Path::new("/from/flag.db")), Some(false))
            .unwrap();
        assert_eq!(ctx.output_mode, OutputMode::Json);
        assert_eq!(ctx.db_path().unwrap(), PathBuf::from("/from/flag.db"));
        assert!(!ctx.config.client.dry_run);
    }

    #[test]
    fn test_config_values_kept_without_flags() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[client]\ndb_location = \"/from/file.db\"\n");

        let ctx = RunContext::from_args(false, false, Some(&path), None, None).unwrap();
        assert_eq!(ctx.output_mode, OutputMode::Tty);
        assert_eq!(ctx.db_path().unwrap(), PathBuf::from("/from/file.db"));
        assert!(ctx.config.client.dry_run);
    }
}
