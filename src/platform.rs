use std::env;
use std::path::PathBuf;

use anyhow::{bail, Result};

fn dirs_home() -> Option<PathBuf> {
    env::var("HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| env::var("USERPROFILE").ok().map(PathBuf::from))
}

/// Data directory for recsync (database, destination credentials).
///
/// `RECSYNC_DATA_DIR` wins over the platform default.
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = env::var("RECSYNC_DATA_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    let dir = if let Ok(xdg) = env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg).join("recsync")
    } else if let Some(home) = dirs_home() {
        if cfg!(target_os = "macos") {
            home.join("Library").join("Application Support").join("recsync")
        } else {
            home.join(".local").join("share").join("recsync")
        }
    } else {
        bail!("Cannot determine data directory");
    };

    Ok(dir)
}
