/// Integration test suite — drives the compiled `comment-watch` binary.
///
/// All tests invoke the binary via subprocess. The `CARGO_BIN_EXE_comment-watch`
/// environment variable is automatically set by Cargo during `cargo test` to
/// point to the compiled binary for the current profile.
///
/// The long-running `watch` command is covered by the in-crate dispatch-loop
/// and notify end-to-end tests (src/trigger.rs); the one-shot `scan` command
/// exercises the same marker extraction, ignore rules, config loading, and
/// output formatting through the full CLI surface.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_comment-watch"))
}

fn fixture() -> TempDir {
    tempfile::tempdir().expect("tempdir")
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, content).expect("write fixture");
}

/// Run a comment-watch command and assert it exits successfully.
/// Returns stdout as a String.
fn run_success(args: &[&str]) -> String {
    let out = Command::new(binary())
        .args(args)
        .output()
        .expect("failed to invoke comment-watch binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        out.status.success(),
        "command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
        args,
        out.status,
        stdout,
        stderr
    );
    stdout
}

/// Run a comment-watch command and assert it exits with a non-zero status.
/// Returns (stdout, stderr) as Strings.
fn run_failure(args: &[&str]) -> (String, String) {
    let out = Command::new(binary())
        .args(args)
        .output()
        .expect("failed to invoke comment-watch binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        !out.status.success(),
        "command {:?} expected to fail but exited successfully\nstdout: {}\nstderr: {}",
        args,
        stdout,
        stderr
    );
    (stdout, stderr)
}

// ---------------------------------------------------------------------------
// scan command
// ---------------------------------------------------------------------------

#[test]
fn test_scan_reports_passive_marker() {
    let dir = fixture();
    write(dir.path(), "a.rs", "fn main() {}\n// agent add docs\n");
    write(dir.path(), "b.rs", "fn helper() {}\n");

    let stdout = run_success(&["scan", dir.path().to_str().unwrap()]);
    assert!(
        stdout.contains("a.rs:2: // agent add docs"),
        "scan should report the marker line\nstdout: {}",
        stdout
    );
    assert!(
        stdout.contains("Found 1 file(s) with marker comments."),
        "scan should count marker files\nstdout: {}",
        stdout
    );
}

#[test]
fn test_scan_json_output() {
    let dir = fixture();
    write(dir.path(), "a.rs", "// agent tidy imports\n");

    let stdout = run_success(&["scan", "--json", dir.path().to_str().unwrap()]);
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("scan --json output is not valid JSON");
    assert_eq!(parsed["count"], 1);
    assert_eq!(parsed["comments"][0]["line"], 1);
    assert_eq!(parsed["comments"][0]["has_trigger"], false);
}

#[test]
fn test_scan_detects_trigger_marker() {
    let dir = fixture();
    write(dir.path(), "a.rs", "// agent note first\n// !agent go now\n");

    let stdout = run_success(&["scan", "--json", dir.path().to_str().unwrap()]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(parsed["count"], 1);
    assert_eq!(parsed["comments"][0]["has_trigger"], true);
    assert_eq!(
        parsed["comments"][0]["lines"]
            .as_array()
            .map(|lines| lines.len()),
        Some(2),
        "both marker lines belong to the same group"
    );
}

#[test]
fn test_scan_skips_default_ignored_dirs() {
    let dir = fixture();
    write(
        dir.path(),
        "node_modules/pkg/index.js",
        "// !agent should never fire\n",
    );
    write(dir.path(), "target/debug/gen.rs", "// agent generated\n");

    let stdout = run_success(&["scan", dir.path().to_str().unwrap()]);
    assert!(
        stdout.contains("No marker comments found."),
        "dependency and build dirs are ignored\nstdout: {}",
        stdout
    );
}

#[test]
fn test_scan_custom_marker_flag() {
    let dir = fixture();
    write(dir.path(), "a.rs", "// todo revisit\n// agent untracked token\n");

    let stdout = run_success(&["scan", "--marker", "todo", dir.path().to_str().unwrap()]);
    assert!(stdout.contains("a.rs:1: // todo revisit"));
    assert!(
        !stdout.contains("untracked token"),
        "only the configured token matches\nstdout: {}",
        stdout
    );
}

#[test]
fn test_scan_reads_config_file() {
    let dir = fixture();
    write(dir.path(), "comment-watch.toml", "marker = \"todo\"\n");
    write(dir.path(), "a.rs", "// todo from config\n");

    let stdout = run_success(&["scan", dir.path().to_str().unwrap()]);
    assert!(
        stdout.contains("a.rs:1: // todo from config"),
        "marker token from comment-watch.toml applies\nstdout: {}",
        stdout
    );
}

#[test]
fn test_scan_empty_tree_reports_none() {
    let dir = fixture();
    let stdout = run_success(&["scan", dir.path().to_str().unwrap()]);
    assert!(stdout.contains("No marker comments found."));
}

#[test]
fn test_scan_rejects_invalid_marker() {
    let dir = fixture();
    let (_stdout, stderr) = run_failure(&["scan", "--marker", "a b", dir.path().to_str().unwrap()]);
    assert!(
        stderr.contains("marker token"),
        "invalid token should explain itself\nstderr: {}",
        stderr
    );
}

// ---------------------------------------------------------------------------
// CLI surface
// ---------------------------------------------------------------------------

#[test]
fn test_help_lists_subcommands() {
    let stdout = run_success(&["--help"]);
    assert!(stdout.contains("watch"));
    assert!(stdout.contains("scan"));
}
