//! CLI end-to-end tests
//!
//! Tests for the tubeforged command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the tubeforged binary
#[allow(deprecated)]
fn tubeforged_cmd() -> Command {
    Command::cargo_bin("tubeforged").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = tubeforged_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = tubeforged_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tubeforged"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = tubeforged_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("tubeforged "));
}

#[test]
fn test_cli_check_tools_lists_both_tools() {
    let mut cmd = tubeforged_cmd();
    cmd.arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg"))
        .stdout(predicate::str::contains("yt-dlp"));
}

#[test]
fn test_cli_start_help() {
    let mut cmd = tubeforged_cmd();
    cmd.args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--port"));
}

#[test]
fn test_cli_convert_help_mentions_recode() {
    let mut cmd = tubeforged_cmd();
    cmd.args(["convert", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--recode"));
}

#[test]
fn test_cli_validate_defaults() {
    let mut cmd = tubeforged_cmd();
    cmd.arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("0.0.0.0:8908"));
}

#[test]
fn test_cli_validate_config_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    fs::write(
        &config_path,
        r#"{ "server": { "port": 9000 }, "conversion": { "remux_only": false } }"#,
    )
    .unwrap();

    let mut cmd = tubeforged_cmd();
    cmd.arg("validate")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains(":9000"))
        .stdout(predicate::str::contains("remux_only=false"));
}

#[test]
fn test_cli_validate_warns_on_language_mismatch() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    fs::write(
        &config_path,
        r#"{ "download": { "subtitle_language": "de" } }"#,
    )
    .unwrap();

    let mut cmd = tubeforged_cmd();
    cmd.arg("validate")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("warning: conversion.subtitle_language"));
}

#[test]
fn test_cli_validate_malformed_config_fails() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    fs::write(&config_path, "{ not json").unwrap();

    let mut cmd = tubeforged_cmd();
    cmd.args(["validate"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("config parse error"));
}

#[test]
fn test_cli_download_rejects_bad_spec() {
    let dir = tempdir().unwrap();
    let list = dir.path().join("links.txt");
    fs::write(&list, "x https://www.youtube.com/watch?v=abc123\n").unwrap();

    let mut cmd = tubeforged_cmd();
    cmd.arg("download")
        .arg(&list)
        .arg("--staging-dir")
        .arg(dir.path().join("staging"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("a, v, av, va"));
}

#[test]
fn test_cli_download_missing_file_fails() {
    let dir = tempdir().unwrap();

    let mut cmd = tubeforged_cmd();
    cmd.arg("download")
        .arg(dir.path().join("nope.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot read download list"));
}

#[test]
fn test_cli_download_without_links_is_noop() {
    let dir = tempdir().unwrap();
    let list = dir.path().join("links.txt");
    fs::write(&list, "# nothing here\nhttps://example.com/video\n").unwrap();

    let mut cmd = tubeforged_cmd();
    cmd.arg("download")
        .arg(&list)
        .assert()
        .success()
        .stdout(predicate::str::contains("No links found"));
}

#[cfg(unix)]
mod with_fake_ffmpeg {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    fn write_script(dir: &Path, exit_code: i32) -> PathBuf {
        let script = dir.join("fake-ffmpeg");
        fs::write(&script, format!("#!/bin/sh\nexit {exit_code}\n")).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn write_config(dir: &Path, ffmpeg: &Path) -> PathBuf {
        let config = dir.join("config.json");
        let json = serde_json::json!({ "tools": { "ffmpeg_path": ffmpeg } });
        fs::write(&config, json.to_string()).unwrap();
        config
    }

    #[test]
    fn convert_empty_staging_does_nothing() {
        let dir = tempdir().unwrap();
        let config = write_config(dir.path(), &write_script(dir.path(), 1));

        let mut cmd = tubeforged_cmd();
        cmd.arg("--config")
            .arg(&config)
            .arg("convert")
            .arg("--staging-dir")
            .arg(dir.path().join("staging"))
            .arg("--output-dir")
            .arg(dir.path().join("output"))
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to convert"));

        assert!(dir.path().join("staging").is_dir());
        assert!(dir.path().join("output").is_dir());
    }

    #[test]
    fn convert_clears_staging_on_success() {
        let dir = tempdir().unwrap();
        let staging = dir.path().join("staging");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("av_Title-abc123.webm"), b"media").unwrap();
        fs::write(staging.join("av_Title-abc123.en.vtt"), b"WEBVTT").unwrap();
        let config = write_config(dir.path(), &write_script(dir.path(), 0));

        let mut cmd = tubeforged_cmd();
        cmd.arg("--config")
            .arg(&config)
            .arg("--staging-dir")
            .arg(&staging)
            .arg("--output-dir")
            .arg(dir.path().join("output"))
            .arg("convert")
            .assert()
            .success()
            .stdout(predicate::str::contains("Converted 2 output(s)"));

        assert_eq!(fs::read_dir(&staging).unwrap().count(), 0);
    }

    #[test]
    fn convert_failure_keeps_staging() {
        let dir = tempdir().unwrap();
        let staging = dir.path().join("staging");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("v_Title-abc123.mkv"), b"media").unwrap();
        let config = write_config(dir.path(), &write_script(dir.path(), 1));

        let mut cmd = tubeforged_cmd();
        cmd.arg("--config")
            .arg(&config)
            .arg("--staging-dir")
            .arg(&staging)
            .arg("--output-dir")
            .arg(dir.path().join("output"))
            .arg("convert")
            .arg("--recode")
            .assert()
            .failure();

        assert!(staging.join("v_Title-abc123.mkv").exists());
    }
}
