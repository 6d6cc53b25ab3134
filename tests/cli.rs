mod common;

use predicates::prelude::*;

use common::TestEnv;

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn status_on_empty_database() {
    let env = TestEnv::new();
    let output = env.cmd_json().arg("status").output().unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["file_type"], "TXT");
    assert_eq!(json["record_type"], "chat_file");
    assert_eq!(json["unsynced"], 0);
    assert_eq!(json["candidates"].as_array().unwrap().len(), 0);
    assert!(env.db_path.exists());
}

#[test]
fn status_lists_pending_meetings_newest_first() {
    let env = TestEnv::with_meetings();
    let output = env.cmd_json().arg("status").output().unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["unsynced"], 2);
    assert_eq!(json["by_status"]["synced"], 1);
    let uuids: Vec<&str> = json["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["uuid"].as_str().unwrap())
        .collect();
    assert_eq!(uuids, vec!["m3", "m2"]);
}

#[test]
fn status_honors_record_type_override() {
    let env = TestEnv::with_meetings();
    let output = env
        .cmd_json()
        .arg("status")
        .env("RECSYNC_FILE_TYPE", "M4A")
        .env("RECSYNC_RECORD_TYPE", "audio_only")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["unsynced"], 3);
}

#[test]
fn status_text_output() {
    let env = TestEnv::with_meetings();
    env.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 record(s) pending in 2 meeting(s)"))
        .stdout(predicate::str::contains("Daily Standup"));
}

#[test]
fn reset_requeues_failed_records() {
    let env = TestEnv::with_meetings();
    let output = env.cmd_json().arg("reset").output().unwrap();
    assert!(output.status.success());

    // m2-chat was failed; every audio record was already queued.
    assert_eq!(stdout_json(&output)["reset"], 1);
    assert_eq!(env.record_status("m2-chat"), "queued");
    assert_eq!(env.record_status("m1-chat"), "synced");
}

#[test]
fn admin_db_info_and_clear() {
    let env = TestEnv::with_meetings();
    let output = env.cmd_json().args(["admin", "db", "info"]).output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["total_meetings"], 3);
    assert_eq!(json["total_records"], 6);
    assert_eq!(json["synced_records"], 1);

    env.cmd()
        .args(["admin", "db", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared database"));
    assert!(!env.db_path.exists());
}

#[test]
fn admin_db_info_without_database() {
    let env = TestEnv::new();
    env.cmd_json()
        .args(["admin", "db", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"exists\":false"));
    assert!(!env.db_path.exists());
}

#[test]
fn db_flag_overrides_configured_location() {
    let env = TestEnv::new();
    let other = env.dir.path().join("other.db");
    env.cmd().arg("--db").arg(&other).arg("reset").assert().success();
    assert!(other.exists());
    assert!(!env.db_path.exists());
}

#[test]
fn drive_status_when_not_authorized() {
    let env = TestEnv::new();
    let output = env.cmd_json().args(["drive", "status"]).output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["authorized"], false);
}

#[test]
fn sync_requires_drive_authorization() {
    let env = TestEnv::with_meetings();
    let config = std::fs::read_to_string(&env.config_path).unwrap();
    std::fs::write(
        &env.config_path,
        format!("{}\n[drive]\nclient_id = \"gid\"\nclient_secret = \"gsecret\"\n", config),
    )
    .unwrap();

    env.cmd()
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("drive init"));
    assert_eq!(env.record_status("m3-chat"), "queued");
}

#[test]
fn missing_explicit_config_is_an_error() {
    let env = TestEnv::new();
    let mut cmd = assert_cmd::cargo_bin_cmd!("recsync");
    cmd.current_dir(env.dir.path())
        .args(["--config", "does-not-exist.toml", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.toml"));
}

#[test]
fn invalid_env_value_is_an_error() {
    let env = TestEnv::new();
    env.cmd()
        .arg("status")
        .env("RECSYNC_CUTOFF", "yesterday")
        .assert()
        .failure()
        .stderr(predicate::str::contains("RECSYNC_CUTOFF"));
}

#[test]
fn invalid_subcommand_shows_help() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("recsync");
    cmd.arg("nonexistent-subcommand");
    cmd.assert().failure();
}
