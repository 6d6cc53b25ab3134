#![allow(dead_code)]

use std::path::PathBuf;

use assert_cmd::Command;
use rusqlite::Connection;
use tempfile::TempDir;

/// An isolated working directory with its own config file, database and data directory.
pub struct TestEnv {
    pub dir: TempDir,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("state").join("recsync.db");
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            format!(
                r#"[source]
account_id = "acct"
client_id = "cid"
client_secret = "secret"
user_ids = ["host@example.com"]

[client]
download_location = "{}"
db_location = "{}"
"#,
                dir.path().join("downloads").display(),
                db_path.display()
            ),
        )
        .unwrap();
        TestEnv {
            dir,
            db_path,
            config_path,
        }
    }

    /// An environment whose database already holds a few meetings.
    ///
    /// `m1` has its chat file synced, `m2` failed, `m3` queued. Every meeting also
    /// carries an audio file that the default TXT filter ignores.
    pub fn with_meetings() -> Self {
        let env = Self::new();
        // Let the binary create the schema.
        env.cmd().arg("reset").assert().success();

        let conn = Connection::open(&env.db_path).unwrap();
        for (uuid, day, status) in [("m1", 3, "synced"), ("m2", 4, "failed"), ("m3", 5, "queued")] {
            let start = format!("2024-05-0{} 09:00:00", day);
            conn.execute(
                "INSERT INTO meetings (uuid, id, topic, start_time) VALUES (?1, 81234567890, 'Daily Standup', ?2)",
                rusqlite::params![uuid, start],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO records (id, meeting_id, type, start_time, file_extension, file_size, download_url, status)
                 VALUES (?1, ?2, 'chat_file', ?3, 'TXT', 2048, 'https://recordings.example.com/x', ?4)",
                rusqlite::params![format!("{}-chat", uuid), uuid, start, status],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO records (id, meeting_id, type, start_time, file_extension, file_size, download_url)
                 VALUES (?1, ?2, 'audio_only', ?3, 'M4A', 4096, 'https://recordings.example.com/y')",
                rusqlite::params![format!("{}-audio", uuid), uuid, start],
            )
            .unwrap();
        }
        env
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = assert_cmd::cargo_bin_cmd!("recsync");
        cmd.current_dir(self.dir.path());
        cmd.arg("--config").arg(&self.config_path);
        cmd.env("RECSYNC_DATA_DIR", self.dir.path().join("data"));
        for var in ["RECSYNC_DB_LOCATION", "RECSYNC_DRY_RUN", "RECSYNC_CUTOFF", "RECSYNC_FILE_TYPE", "RECSYNC_RECORD_TYPE"] {
            cmd.env_remove(var);
        }
        cmd.env("NO_COLOR", "1");
        cmd
    }

    pub fn cmd_json(&self) -> Command {
        let mut cmd = self.cmd();
        cmd.arg("--json");
        cmd
    }

    pub fn record_status(&self, id: &str) -> String {
        let conn = Connection::open(&self.db_path).unwrap();
        conn.query_row("SELECT status FROM records WHERE id = ?1", [id], |row| row.get(0))
            .unwrap()
    }
}
