use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn enricher() -> Command {
    let mut cmd = Command::cargo_bin("transcript-enricher").unwrap();
    cmd.env("RUST_LOG", "off")
        .env_remove("DATABASE_PATH")
        .env_remove("TRANSCRIPT_ENRICHER_CONFIG")
        .env_remove("AI_PROVIDER")
        .env_remove("AI_MAX_TOKENS")
        .env_remove("AI_TEMPERATURE");
    cmd
}

fn write_config(dir: &Path) -> std::path::PathBuf {
    let config = dir.join("config.yaml");
    let database = dir.join("transcripts.db");
    std::fs::write(
        &config,
        format!("database:\n  path: {}\n", database.display()),
    )
    .unwrap();
    config
}

#[test]
fn resolve_prints_canonical_id() {
    enricher()
        .args(["resolve", "https://youtu.be/dQw4w9WgXcQ?si=abcdef"])
        .assert()
        .success()
        .stdout("dQw4w9WgXcQ\n");
}

#[test]
fn resolve_json_output() {
    enricher()
        .args(["resolve", "https://www.youtube.com/shorts/dQw4w9WgXcQ", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"video_id\":\"dQw4w9WgXcQ\""));
}

#[test]
fn resolve_rejects_other_platforms() {
    enricher()
        .args(["resolve", "https://vimeo.com/123456"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn help_lists_commands() {
    enricher()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("summarize"))
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("ask"));
}

#[test]
fn config_show_uses_given_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    enricher()
        .arg("--config")
        .arg(&config)
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Current Configuration:"))
        .stdout(predicate::str::contains("transcripts.db"));
}

#[test]
fn config_creates_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("nested").join("config.yaml");

    enricher()
        .arg("--config")
        .arg(&config)
        .arg("config")
        .assert()
        .success();

    assert!(config.exists());
}

#[test]
fn show_unknown_transcript_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    enricher()
        .arg("--config")
        .arg(&config)
        .args(["show", "no-such-transcript"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("transcript no-such-transcript not found"));
}

#[test]
fn summarize_rejects_unknown_kind() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    enricher()
        .arg("--config")
        .arg(&config)
        .args(["--quiet", "summarize", "some-transcript", "--kind", "outline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid kind"));
}
