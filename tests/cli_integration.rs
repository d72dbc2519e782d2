//! CLI integration tests for keg.
//!
//! These tests drive the `keg` binary end to end: option resolution and
//! staging files through a scoped workspace.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the keg binary command, isolated from the user's configuration.
fn keg(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("keg").unwrap();
    cmd.env("HOME", home).env_remove("KEG_TEMP");
    cmd
}

/// Create a temporary directory for test projects.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

fn entries(dir: &Path) -> Vec<std::path::PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect()
}

// ============================================================================
// keg options
// ============================================================================

#[test]
fn test_options_with_and_without_defaults() {
    let tmp = temp_dir();

    keg(tmp.path())
        .args([
            "options",
            "--declare",
            "with-foo",
            "--declare",
            "without-bar",
            "--query",
            "foo",
            "--query",
            "bar",
            "--query",
            "baz",
            "--",
            "--with-foo",
        ])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("used: --with-foo\n"))
        .stdout(predicate::str::contains("unused: --without-bar\n"))
        .stdout(predicate::str::contains("with foo: true\n"))
        .stdout(predicate::str::contains("with bar: true\n"))
        .stdout(predicate::str::contains("with baz: false\n"));
}

#[test]
fn test_options_head_build() {
    let tmp = temp_dir();

    keg(tmp.path())
        .args(["options", "--", "--HEAD"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("head: true\n"))
        .stdout(predicate::str::contains("stable: false\n"))
        .stdout(predicate::str::contains("any args or options: true\n"));
}

#[test]
fn test_options_nothing_supplied() {
    let tmp = temp_dir();

    keg(tmp.path())
        .args(["options"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("stable: true\n"))
        .stdout(predicate::str::contains("any args or options: false\n"));
}

#[test]
fn test_options_json() {
    let tmp = temp_dir();

    let output = keg(tmp.path())
        .args([
            "options",
            "--json",
            "--declare",
            "with-foo",
            "--declare",
            "without-bar",
            "--query",
            "bar",
            "--",
            "--with-foo",
            "--build-bottle",
        ])
        .current_dir(tmp.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["used"], serde_json::json!(["with-foo"]));
    assert_eq!(report["unused"], serde_json::json!(["without-bar"]));
    assert_eq!(report["bottle"], serde_json::json!(true));
    assert_eq!(report["queries"][0]["with"], serde_json::json!(true));
    assert_eq!(report["queries"][0]["without"], serde_json::json!(false));
}

#[test]
fn test_options_dependencies_imply_declarations() {
    let tmp = temp_dir();

    keg(tmp.path())
        .args([
            "options",
            "--dependency",
            "qt:optional",
            "--dependency",
            "org/tap/readline:recommended",
            "--dependency",
            "cmake:build",
        ])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("declared: --with-qt --without-readline\n"))
        .stdout(predicate::str::contains("dependency qt: pruned\n"))
        .stdout(predicate::str::contains("dependency org/tap/readline: kept\n"))
        .stdout(predicate::str::contains("dependency cmake: kept\n"));
}

#[test]
fn test_options_rejects_bad_dependency() {
    let tmp = temp_dir();

    keg(tmp.path())
        .args(["options", "--dependency", "qt:sometimes"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --dependency"));
}

// ============================================================================
// keg stage
// ============================================================================

#[test]
fn test_stage_cleans_up_workspace() {
    let tmp = temp_dir();
    let scratch = tmp.path().join("scratch");
    fs::create_dir_all(tmp.path().join("src/lib")).unwrap();
    fs::write(tmp.path().join("src/main.c"), "int main(void) { return 0; }").unwrap();
    fs::write(tmp.path().join("src/lib/util.c"), "void util(void) {}").unwrap();
    fs::write(tmp.path().join("configure"), "#!/bin/sh").unwrap();

    keg(tmp.path())
        .args(["stage", "pkg@1.2", "--copy", "src", "--copy", "configure", "--temp-dir"])
        .arg(&scratch)
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("configure\n"))
        .stdout(predicate::str::contains("src/main.c\n"))
        .stdout(predicate::str::contains("src/lib/util.c\n"))
        .stderr(predicate::str::contains("pkgA1.2-"))
        .stderr(predicate::str::contains("Retained").not());

    assert!(scratch.is_dir());
    assert!(entries(&scratch).is_empty());
    // Sources are copied, never moved
    assert!(tmp.path().join("src/main.c").exists());
}

#[test]
fn test_stage_retain_keeps_workspace() {
    let tmp = temp_dir();
    let scratch = tmp.path().join("scratch");
    fs::write(tmp.path().join("patch.diff"), "--- a\n+++ b\n").unwrap();

    keg(tmp.path())
        .args(["stage", "foo", "--retain", "--copy", "patch.diff", "--temp-dir"])
        .arg(&scratch)
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Retained").count(1));

    let kept = entries(&scratch);
    assert_eq!(kept.len(), 1);
    assert!(kept[0].join("patch.diff").exists());
}

#[test]
fn test_stage_retain_quietly() {
    let tmp = temp_dir();
    let scratch = tmp.path().join("scratch");

    keg(tmp.path())
        .args(["--quiet", "stage", "foo", "--retain", "--temp-dir"])
        .arg(&scratch)
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Retained").not());

    assert_eq!(entries(&scratch).len(), 1);
}

#[test]
fn test_stage_failure_still_cleans_up() {
    let tmp = temp_dir();
    let scratch = tmp.path().join("scratch");

    keg(tmp.path())
        .args(["stage", "broken", "--copy", "does-not-exist.c", "--temp-dir"])
        .arg(&scratch)
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot stage"));

    assert!(entries(&scratch).is_empty());
}

#[test]
fn test_stage_temp_dir_from_env() {
    let tmp = temp_dir();
    let scratch = tmp.path().join("from-env");

    keg(tmp.path())
        .args(["stage", "envpkg", "--retain"])
        .env("KEG_TEMP", &scratch)
        .current_dir(tmp.path())
        .assert()
        .success();

    let kept = entries(&scratch);
    assert_eq!(kept.len(), 1);
    let name = kept[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("envpkg-"));
}

#[cfg(unix)]
#[test]
fn test_stage_interrupted_still_cleans_up() {
    use std::os::unix::fs::OpenOptionsExt;
    use std::os::unix::process::ExitStatusExt;

    use nix::sys::signal::{kill, Signal};
    use nix::sys::stat::Mode;
    use nix::unistd::{mkfifo, Pid};

    let tmp = temp_dir();
    let scratch = tmp.path().join("scratch");
    // Copying from a fifo blocks until something writes to it
    let fifo = tmp.path().join("slow-source");
    mkfifo(&fifo, Mode::S_IRUSR | Mode::S_IWUSR).unwrap();

    let mut child = keg(tmp.path())
        .args(["stage", "slow", "--copy", "slow-source", "--temp-dir"])
        .arg(&scratch)
        .current_dir(tmp.path())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(30);
    while !scratch.is_dir() || entries(&scratch).is_empty() {
        assert!(Instant::now() < deadline, "workspace never appeared");
        thread::sleep(Duration::from_millis(20));
    }
    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();

    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        // Release the copy if it is still waiting on the fifo
        if let Ok(writer) = fs::OpenOptions::new()
            .write(true)
            .custom_flags(nix::libc::O_NONBLOCK)
            .open(&fifo)
        {
            drop(writer);
        }
        assert!(Instant::now() < deadline, "keg stage did not exit");
        thread::sleep(Duration::from_millis(20));
    };

    assert_eq!(status.signal(), Some(Signal::SIGINT as i32));
    assert!(entries(&scratch).is_empty());
}

// ============================================================================
// keg completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = temp_dir();

    keg(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("keg"));
}
