use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const CONFIG_DIR_ENV: &str = "DIALOGUE_EDITOR_CONFIG_DIR";

/// Command with its config isolated in `temp_dir`
fn editor_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("dialogue-editor").into();
    cmd.env(CONFIG_DIR_ENV, temp_dir.path())
        .env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// CLI Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    let temp_dir = TempDir::new().unwrap();

    editor_cmd(&temp_dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("dialogue-editor"))
        .stdout(predicate::str::contains("text-to-speech"));
}

#[test]
fn test_version_displays() {
    let temp_dir = TempDir::new().unwrap();

    editor_cmd(&temp_dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dialogue-editor"));
}

#[test]
fn test_help_shows_subcommands() {
    let temp_dir = TempDir::new().unwrap();

    editor_cmd(&temp_dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("edit"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("voices"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("--offline"));
}

// ============================================================================
// Config Command Tests
// ============================================================================

#[test]
fn test_config_show_creates_default_file() {
    let temp_dir = TempDir::new().unwrap();

    editor_cmd(&temp_dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://127.0.0.1:8000"))
        .stdout(predicate::str::contains("emotion_locale       = chinese"));

    assert!(temp_dir.path().join("dialogue-editor.toml").exists());
}

#[test]
fn test_config_set_persists_value() {
    let temp_dir = TempDir::new().unwrap();

    editor_cmd(&temp_dir)
        .args(["config", "set", "server_url", "http://tts.local:9000/"])
        .assert()
        .success();

    let content = fs::read_to_string(temp_dir.path().join("dialogue-editor.toml")).unwrap();
    assert!(content.contains("server_url = \"http://tts.local:9000\""));

    editor_cmd(&temp_dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://tts.local:9000"));
}

#[test]
fn test_config_set_rejects_unknown_key() {
    let temp_dir = TempDir::new().unwrap();

    editor_cmd(&temp_dir)
        .args(["config", "set", "colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn test_config_set_rejects_bad_locale() {
    let temp_dir = TempDir::new().unwrap();

    editor_cmd(&temp_dir)
        .args(["config", "set", "emotion_locale", "klingon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("emotion_locale must be one of"));
}

// ============================================================================
// Service Commands
// ============================================================================

#[test]
fn test_list_fails_when_service_unreachable() {
    let temp_dir = TempDir::new().unwrap();

    editor_cmd(&temp_dir)
        .args(["list", "--server", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to list projects"));
}

#[test]
fn test_list_offline_shows_empty_state() {
    let temp_dir = TempDir::new().unwrap();

    editor_cmd(&temp_dir)
        .args(["--offline", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No projects yet"));
}

#[test]
fn test_voices_offline_lists_categories() {
    let temp_dir = TempDir::new().unwrap();

    editor_cmd(&temp_dir)
        .args(["--offline", "voices"])
        .assert()
        .success()
        .stdout(predicate::str::contains("通用场景:"))
        .stdout(predicate::str::contains("zh_female_vv_uranus_bigtts"));
}

#[test]
fn test_offline_conflicts_with_server() {
    let temp_dir = TempDir::new().unwrap();

    editor_cmd(&temp_dir)
        .args(["--offline", "--server", "http://127.0.0.1:8000", "list"])
        .assert()
        .failure();
}

// ============================================================================
// Interactive Session Tests
// ============================================================================

#[test]
fn test_session_analyze_edit_and_show() {
    let temp_dir = TempDir::new().unwrap();

    editor_cmd(&temp_dir)
        .args(["--offline", "edit"])
        .write_stdin(
            "analyze\nAlice: Hello\nBob: Hi there\n.\n\
             line line_0 speed_ratio 1.5\n\
             show\nquit\n",
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("2 speakers, 2 lines"))
        .stdout(predicate::str::contains("speed: 1.5"))
        .stdout(predicate::str::contains("Alice"))
        .stdout(predicate::str::contains("Bob"));
}

#[test]
fn test_session_rejects_blank_text() {
    let temp_dir = TempDir::new().unwrap();

    editor_cmd(&temp_dir)
        .args(["--offline"])
        .write_stdin("analyze\n.\nquit\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Please enter some dialogue text"));
}

#[test]
fn test_session_generate_preview_and_download() {
    let temp_dir = TempDir::new().unwrap();
    let out_dir = temp_dir.path().join("out");
    fs::create_dir_all(&out_dir).unwrap();

    editor_cmd(&temp_dir)
        .args(["--offline", "edit"])
        .write_stdin(format!(
            "analyze Alice: Hello\ngenerate\ny\ndownload {}\nquit\n",
            out_dir.display()
        ))
        .assert()
        .success()
        .stdout(predicate::str::contains("All audio generated"))
        .stdout(predicate::str::contains("Saved audio to"));

    let saved: Vec<_> = fs::read_dir(&out_dir).unwrap().collect();
    assert_eq!(saved.len(), 1);
}

#[test]
fn test_session_declined_generation_stays_in_edit() {
    let temp_dir = TempDir::new().unwrap();

    editor_cmd(&temp_dir)
        .args(["--offline", "edit"])
        .write_stdin("analyze Alice: Hello\ngenerate\nn\npreview\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("All audio generated").not())
        .stderr(predicate::str::contains("No generated audio"));
}

#[test]
fn test_session_back_from_input_is_reported() {
    let temp_dir = TempDir::new().unwrap();

    editor_cmd(&temp_dir)
        .args(["--offline", "edit"])
        .write_stdin("back\nquit\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Cannot go back while in the input phase"));
}
