//! Test-only helpers for building throwaway git repositories.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Create an empty repository with a local identity and signing disabled.
pub fn init_repo() -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    git_stdout(dir.path(), &["init", "--quiet"]);
    git_stdout(dir.path(), &["config", "user.name", "gitpilot tests"]);
    git_stdout(dir.path(), &["config", "user.email", "tests@gitpilot.invalid"]);
    git_stdout(dir.path(), &["config", "commit.gpgsign", "false"]);
    dir
}

/// Run git in `dir`, panic on failure, return trimmed stdout.
pub fn git_stdout(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Number of commits reachable from HEAD (0 on an unborn branch).
pub fn commit_count(dir: &Path) -> usize {
    let output = Command::new("git")
        .args(["rev-list", "--count", "HEAD"])
        .current_dir(dir)
        .output()
        .expect("spawn git");
    if !output.status.success() {
        return 0;
    }
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse()
        .unwrap_or(0)
}
