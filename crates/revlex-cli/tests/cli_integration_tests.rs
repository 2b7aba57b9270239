//! CLI integration tests
//!
//! Run the compiled `revlex` binary against a temporary database and check
//! the JSON envelopes it prints.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("revlex.db")
}

/// Run the CLI and parse its stdout; returns the exit success flag too
fn revlex(db: &Path, args: &[&str]) -> (bool, Value) {
    let output = Command::new(env!("CARGO_BIN_EXE_revlex"))
        .env("RUST_LOG", "off")
        .arg("--db")
        .arg(db)
        .args(args)
        .output()
        .expect("Failed to execute CLI");
    let json: Value = serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&output.stdout)
        )
    });
    (output.status.success(), json)
}

fn create(db: &Path, text: &str) -> String {
    let (ok, json) = revlex(db, &["create", "--text", text, "--scope", "shop"]);
    assert!(ok, "create failed: {}", json);
    json["data"]["id"].as_str().unwrap().to_string()
}

#[test]
fn test_create_edit_finalize_show() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);
    let id = create(&db, "a\nb");

    // Edit opens a snapshot at sequence 2
    let (ok, json) = revlex(&db, &["edit", &id, "--text", "a\nB", "--author", "alice"]);
    assert!(ok);
    assert_eq!(json["data"]["changed"], true);
    assert_eq!(json["data"]["snapshot"]["sequence"], 2);
    assert_eq!(json["data"]["snapshot"]["lifecycle"], "open");

    // Finalize seals it; a second finalize returns null data
    let (ok, json) = revlex(&db, &["finalize", &id]);
    assert!(ok);
    assert_eq!(json["data"]["lifecycle"], "finalized");
    let (ok, json) = revlex(&db, &["finalize", &id]);
    assert!(ok);
    assert!(json["data"].is_null());

    // Show reflects the current and historical texts
    let (_, json) = revlex(&db, &["show", &id]);
    assert_eq!(json["data"]["current_text"], "a\nB");
    let (_, json) = revlex(&db, &["show", &id, "--seq", "1"]);
    assert_eq!(json["data"]["text"], "a\nb");

    let (ok, json) = revlex(&db, &["verify", &id]);
    assert!(ok);
    assert_eq!(json["data"]["snapshots_verified"], 2);
}

#[test]
fn test_patch_blocked_reports_analysis() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);
    let id = create(&db, "a\nb");
    let patch = r#"[{"op":"replace","path":"/lines/0","value":"x"},{"op":"replace","path":"/lines/0","value":"y"}]"#;

    let (ok, json) = revlex(&db, &["patch", &id, "--patch", patch]);

    assert!(!ok);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "ERR_CONFLICT_BLOCKED");
    assert_eq!(json["details"]["report"]["severity"], "high");

    let (ok, json) = revlex(&db, &["patch", &id, "--patch", patch, "--force"]);
    assert!(ok);
    assert_eq!(json["data"]["report"]["severity"], "high");
}

#[test]
fn test_patch_out_of_range_reports_op_index() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);
    let id = create(&db, "a\nb\nc");

    let (ok, json) = revlex(
        &db,
        &["patch", &id, "--patch", r#"[{"op":"remove","path":"/lines/5"}]"#, "--force"],
    );

    assert!(!ok);
    assert_eq!(json["error"]["code"], "ERR_PATCH_APPLICATION");
    assert_eq!(json["details"]["failed_op_index"], 0);
}

#[test]
fn test_rollback_and_log() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);
    let id = create(&db, "v1");
    for text in ["v2", "v3"] {
        let (ok, _) = revlex(&db, &["edit", &id, "--text", text, "--finalize"]);
        assert!(ok);
    }

    let (ok, json) = revlex(&db, &["rollback", &id, "1", "--actor", "bob", "--reason", "oops"]);
    assert!(ok);
    assert_eq!(json["data"]["customization"]["current_text"], "v1");
    assert_eq!(json["data"]["record"]["kind"], "full");

    let (_, json) = revlex(&db, &["log", &id]);
    let lines = json["data"].as_array().unwrap();
    assert_eq!(lines.len(), 4);
    assert!(lines[3].as_str().unwrap().starts_with("#4 [rollback/finalized]"));

    let (ok, json) = revlex(&db, &["rollback", &id, "9"]);
    assert!(!ok);
    assert_eq!(json["error"]["code"], "ERR_ROLLBACK_TARGET_NOT_FOUND");
}

#[test]
fn test_cherry_pick_and_diff() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);
    let source = create(&db, "a\nb\nc");
    let target = create(&db, "a\nb\nc");
    revlex(&db, &["edit", &source, "--text", "a\nb\nc\nd", "--finalize"]);

    let (ok, json) = revlex(&db, &["cherry-pick", &source, &target, "--seq", "2"]);
    assert!(ok, "cherry-pick failed: {}", json);
    assert_eq!(json["data"]["target"]["current_text"], "a\nb\nc\nd");

    let (ok, json) = revlex(&db, &["diff", &source, "--from", "1", "--to", "2"]);
    assert!(ok);
    assert_eq!(json["data"]["stats"]["additions"], 1);
    assert!(json["data"]["unified"]
        .as_str()
        .unwrap()
        .contains("@@ -1,3 +1,4 @@"));
}

#[test]
fn test_unknown_customization_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);

    let (ok, json) = revlex(&db, &["verify", "cust:missing"]);

    assert!(!ok);
    assert_eq!(json["error"]["code"], "ERR_NOT_FOUND");
}

#[test]
fn test_config_file_is_applied() {
    let dir = TempDir::new().unwrap();
    let db = db_path(&dir);
    let config = dir.path().join("revlex.toml");
    std::fs::write(&config, "log_profile = \"test\"\n[limits]\nmax_text_bytes = 4\n").unwrap();

    let (ok, json) = revlex(
        &db,
        &["--config", config.to_str().unwrap(), "create", "--text", "too long"],
    );

    assert!(!ok);
    assert_eq!(json["error"]["code"], "ERR_INPUT_TOO_LARGE");
}
