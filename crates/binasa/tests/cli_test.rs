//! Integration tests for the `binasa` CLI binary.
//!
//! Offline tests cover argument parsing, help, completions and config
//! handling. Device tests run the binary against a wiremock pump
//! controller with the push stream disabled.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `binasa` binary with env isolation.
///
/// Clears all `BINASA_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn binasa_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("binasa");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("BINASA_PROFILE")
        .env_remove("BINASA_DEVICE")
        .env_remove("BINASA_OUTPUT")
        .env_remove("BINASA_INSECURE")
        .env_remove("BINASA_TIMEOUT");
    cmd
}

/// Command aimed at a mock device, poll-only.
fn device_cmd(home: &Path, server: &MockServer) -> assert_cmd::Command {
    let mut cmd = binasa_cmd(home);
    cmd.args(["--device", &server.uri(), "--no-push", "--timeout", "5"]);
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

async fn mount_status(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = binasa_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    binasa_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("pump controller")
                .and(predicate::str::contains("status"))
                .and(predicate::str::contains("watch"))
                .and(predicate::str::contains("pump")),
        );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    binasa_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("binasa"));
}

#[test]
fn test_invalid_output_format() {
    let home = tempfile::tempdir().unwrap();
    binasa_cmd(home.path())
        .args(["--output", "xml", "status"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("xml"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    binasa_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("binasa"));
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    binasa_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_status_without_device_points_at_config_init() {
    let home = tempfile::tempdir().unwrap();
    binasa_cmd(home.path())
        .arg("status")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("binasa config init"));
}

#[test]
fn test_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    binasa_cmd(home.path())
        .args(["--profile", "garage", "status"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("garage"));
}

#[test]
fn test_config_path_is_under_home() {
    let home = tempfile::tempdir().unwrap();
    binasa_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_then_show() {
    let home = tempfile::tempdir().unwrap();
    binasa_cmd(home.path())
        .args(["--profile", "tank", "config", "init", "--url", "http://192.168.4.1"])
        .assert()
        .success();

    let output = binasa_cmd(home.path())
        .args(["config", "show", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let cfg: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(cfg["default_profile"], "tank");
    assert_eq!(cfg["profiles"]["tank"]["device"], "http://192.168.4.1");
}

#[test]
fn test_config_init_rejects_websocket_url() {
    let home = tempfile::tempdir().unwrap();
    binasa_cmd(home.path())
        .args(["config", "init", "--url", "ws://192.168.4.1:81"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("http"));
}

#[test]
fn test_config_use_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    binasa_cmd(home.path())
        .args(["config", "use", "nowhere"])
        .assert()
        .code(4);
}

// ── Device commands ─────────────────────────────────────────────────

#[test]
fn test_status_unreachable_device() {
    let home = tempfile::tempdir().unwrap();
    let output = binasa_cmd(home.path())
        .args(["--device", "http://127.0.0.1:9", "--no-push", "--timeout", "2", "status"])
        .output()
        .unwrap();
    let code = output.status.code();
    assert!(
        matches!(code, Some(7 | 8)),
        "expected connection or timeout exit code, got {code:?}:\n{}",
        combined_output(&output)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_json_is_normalized() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        json!({ "level": "75%", "pump": 1, "foam": 140, "sensors": [true, true, false] }),
    )
    .await;
    let home = tempfile::tempdir().unwrap();

    let output = device_cmd(home.path(), &server)
        .args(["status", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let snap: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(snap["water_level_percent"], 75);
    assert_eq!(snap["pump_on"], true);
    assert_eq!(snap["foam_percent"], 100);
    assert_eq!(snap["connected_sensors"], json!([true, true, false]));
    assert_eq!(snap["source"], "poll");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_plain() {
    let server = MockServer::start().await;
    mount_status(&server, json!({ "level": 50, "pump": false, "foam": 3 })).await;
    let home = tempfile::tempdir().unwrap();

    device_cmd(home.path(), &server)
        .args(["status", "--output", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("water=50").and(predicate::str::contains("pump=off")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pump_toggle_requires_yes_when_not_interactive() {
    let server = MockServer::start().await;
    mount_status(&server, json!({ "level": 50, "pump": false })).await;
    Mock::given(method("POST"))
        .and(path("/control"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    device_cmd(home.path(), &server)
        .args(["pump", "toggle", "--no-wait"])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pump_toggle_busy_device() {
    let server = MockServer::start().await;
    mount_status(&server, json!({ "level": 50, "pump": false })).await;
    Mock::given(method("POST"))
        .and(path("/control"))
        .and(body_json(json!({ "action": "on" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "busy" })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    device_cmd(home.path(), &server)
        .args(["--yes", "pump", "toggle", "--no-wait"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("busy"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pump_toggle_accepted() {
    let server = MockServer::start().await;
    mount_status(&server, json!({ "level": 50, "pump": true })).await;
    Mock::given(method("POST"))
        .and(path("/control"))
        .and(body_json(json!({ "action": "off" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "ok", "message": "Bomba apagada" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    device_cmd(home.path(), &server)
        .args(["--yes", "pump", "toggle", "--no-wait"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Bomba apagada"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_history_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/history"))
        .and(query_param("date", "2024-03-09"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "hora": "08:00", "agua": 40.0, "espuma": 2.0 },
            { "hora": "08:30", "agua": 62.6, "espuma": 4.2 }
        ])))
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    device_cmd(home.path(), &server)
        .args(["history", "--date", "2024-03-09"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Water %")
                .and(predicate::str::contains("08:30"))
                .and(predicate::str::contains("63")),
        );
}

#[test]
fn test_history_rejects_bad_date() {
    let home = tempfile::tempdir().unwrap();
    binasa_cmd(home.path())
        .args(["--device", "http://127.0.0.1:9", "history", "--date", "yesterday"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("YYYY-MM-DD"));
}
