//! Full runs through the real toolchain against a fake `python` that
//! installs successfully and then plays the app.
//!
//! One test per binary keeps script writes away from concurrent forks.

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use launcher::exit_codes;
use launcher::io::permissions::mark_executable;

/// pip succeeds; `-m streamlit` echoes its argv and then behaves as
/// `app_mode` in the working directory says.
const HEALTHY_PYTHON: &str = r#"#!/bin/sh
case "$1 $2" in
  "--version "*) echo "Python 3.12.3" ;;
  "-m venv") mkdir -p "$3/bin" && cp "$0" "$3/bin/python" && touch "$3/pyvenv.cfg" ;;
  "-m pip") echo "Successfully ran pip $*" ;;
  "-m streamlit")
    echo "ARGS: $*"
    case "$(cat app_mode)" in
      fail) exit 3 ;;
      interrupt) kill -INT $$ ;;
    esac
    ;;
  *) exit 64 ;;
esac
"#;

fn launcher(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_launcher"))
        .arg("--dir")
        .arg(dir)
        .args(args)
        .output()
        .expect("spawn launcher")
}

fn set_app_mode(dir: &Path, mode: &str) {
    fs::write(dir.join("app_mode"), mode).expect("write app mode");
}

#[test]
fn handoff_exit_codes_follow_the_app() {
    let bin = tempfile::tempdir().expect("tempdir");
    let python = bin.path().join("python-healthy");
    fs::write(&python, HEALTHY_PYTHON).expect("write script");
    mark_executable(&python).expect("chmod script");

    let project = tempfile::tempdir().expect("tempdir");
    let root = project.path();
    fs::write(root.join("app.py"), "print('hello')\n").expect("write app");
    fs::write(root.join("requirements.txt"), "plotly\n").expect("write manifest");
    fs::write(
        root.join("launcher.toml"),
        format!("[interpreter]\ncandidates = [{:?}]\n", python.display().to_string()),
    )
    .expect("write config");

    // Fresh project, clean exit, port override reaches the app.
    set_app_mode(root, "ok");
    let output = launcher(root, &["run", "--port", "8600"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(exit_codes::OK), "stderr: {stderr}");
    assert!(stdout.contains("Creating virtual environment"));
    assert!(stdout.contains("Starting app on http://localhost:8600"));
    assert!(stdout.contains("ARGS: -m streamlit run app.py --server.port 8600"));
    assert!(!stderr.contains("could not upgrade pip"));
    assert!(root.join("venv/bin/python").is_file());

    // The app fails on its own: not a launch failure.
    set_app_mode(root, "fail");
    let output = launcher(root, &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(exit_codes::APP_FAILED));
    assert!(stdout.contains("ARGS: -m streamlit run app.py"));
    assert!(!stdout.contains("--server.port"));
    assert!(!stdout.contains("Creating virtual environment"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("app exited with status 3"));

    // The app dies from SIGINT: interrupted, environment kept.
    set_app_mode(root, "interrupt");
    let output = launcher(root, &["run"]);
    assert_eq!(output.status.code(), Some(exit_codes::INTERRUPTED));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Interrupted."));
    assert!(root.join("venv/pyvenv.cfg").is_file());
}
