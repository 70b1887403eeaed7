//! End-to-end tests for the cwcli binary
//!
//! Each test runs in a scratch directory with XDG_CONFIG_HOME pointed at it,
//! so no real config files leak in.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cwcli(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cwcli").unwrap();
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .env_remove("RUST_LOG")
        .env_remove("CHORDWISE_LOG_LEVEL")
        .env_remove("CHORDWISE_ALLOW_EXTENSIONS")
        .env_remove("CHORDWISE_EXTENSION_THRESHOLD")
        .env_remove("CHORDWISE_DUPLICATE_NOTE_ON");
    cmd
}

#[test]
fn names_a_triad() {
    let dir = TempDir::new().unwrap();
    cwcli(&dir)
        .args(["chord", "E4", "G4", "C5"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("C maj\n"));
}

#[test]
fn spells_chord_in_key() {
    let dir = TempDir::new().unwrap();
    cwcli(&dir)
        .args(["chord", "--key", "F major", "A#3", "D4", "F4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("B♭ maj"))
        .stdout(predicate::str::contains("Ⅳ in F major"));
}

#[test]
fn lists_all_candidates_as_json() {
    let dir = TempDir::new().unwrap();
    let output = cwcli(&dir)
        .args(["--json", "chord", "--all", "C4", "D4", "G4"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert!(rows.len() > 1);
    assert_eq!(rows[0]["name"], "C sus2");
    assert_eq!(rows[0]["chord"]["suffix"], "sus2");
    assert_eq!(rows[0]["score"], 0);
}

#[test]
fn reports_when_nothing_fits() {
    let dir = TempDir::new().unwrap();
    cwcli(&dir)
        .args(["chord", "C4", "C#4", "D4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no chord detected"));
}

#[test]
fn bad_note_fails() {
    let dir = TempDir::new().unwrap();
    cwcli(&dir)
        .args(["chord", "C4", "H4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parsing notes"));
}

#[test]
fn check_flags_seventh_inside_octave() {
    let dir = TempDir::new().unwrap();
    cwcli(&dir)
        .args(["check", "--target", "C maj", "C4", "E4", "G4", "B4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("correct:  no"))
        .stdout(predicate::str::contains("extra:    B4"))
        .stdout(predicate::str::contains("goal:     C4 E4 G4"));
}

#[test]
fn config_file_changes_grading() {
    let dir = TempDir::new().unwrap();
    let args = ["check", "--target", "C maj", "C4", "E4", "G4", "C5"];

    cwcli(&dir)
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains("correct:  yes"));

    let path = dir.path().join("strict.toml");
    fs::write(&path, "[performance]\nallow_additional_extensions = false\n").unwrap();
    cwcli(&dir)
        .arg("--config")
        .arg(&path)
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains("correct:  no"));
}

#[test]
fn env_overrides_config() {
    let dir = TempDir::new().unwrap();
    cwcli(&dir)
        .env("CHORDWISE_ALLOW_EXTENSIONS", "false")
        .args(["check", "--target", "C maj", "C4", "E4", "G4", "C5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("correct:  no"));
}

#[test]
fn replays_events_into_a_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.jsonl");
    let notes = ["C4", "E4", "G4", "C4", "F4", "A4", "G4", "B4", "D5", "C5"];
    let lines: Vec<String> = notes
        .iter()
        .enumerate()
        .map(|(i, note)| {
            format!(
                r#"{{"kind":"instant","note":"{}","t":{},"length":400}}"#,
                note,
                i * 500
            )
        })
        .collect();
    fs::write(&path, lines.join("\n")).unwrap();

    cwcli(&dir)
        .arg("key")
        .arg(&path)
        .args(["--at", "5000", "--top", "3"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("C major"))
        .stdout(predicate::str::contains("out of key: 0.0%"));
}

#[test]
fn reads_events_from_stdin() {
    let dir = TempDir::new().unwrap();
    let events = concat!(
        r#"{"kind":"on","note":"A3","t":0}"#,
        "\n",
        r#"{"kind":"off","note":"A3","t":100}"#,
        "\n",
        r#"{"kind":"off","note":"A3","t":200}"#,
        "\n",
    );
    cwcli(&dir)
        .args(["key", "-"])
        .write_stdin(events)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not sounding"));
}

#[test]
fn lists_library_by_triad() {
    let dir = TempDir::new().unwrap();
    cwcli(&dir)
        .args(["chords", "--triad", "dim"])
        .assert()
        .success()
        .stdout(predicate::str::contains("m7b5"))
        .stdout(predicate::str::contains("maj7").not());

    cwcli(&dir)
        .args(["chords", "--triad", "blah"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown triad"));
}

#[test]
fn shows_effective_config() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("chordwise.toml"),
        "[listener]\ndebounce_ms = 250\n",
    )
    .unwrap();
    cwcli(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("debounce_ms = 250"))
        .stdout(predicate::str::contains("# loaded: chordwise.toml"));
}

#[test]
fn debug_logging_reports_config_sources() {
    let dir = TempDir::new().unwrap();
    cwcli(&dir)
        .env("CHORDWISE_LOG_LEVEL", "debug")
        .args(["chord", "C4", "E4", "G4"])
        .assert()
        .success()
        .stderr(predicate::str::contains("loaded configuration"))
        .stderr(predicate::str::contains("CHORDWISE_LOG_LEVEL"));
}

#[test]
fn missing_config_path_does_not_fall_back_to_local_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("chordwise.toml"),
        "[listener]\ndebounce_ms = 250\n",
    )
    .unwrap();
    cwcli(&dir)
        .args(["--config", "typo.toml", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("debounce_ms = 250").not())
        .stdout(predicate::str::contains("# no config files loaded"));
}
