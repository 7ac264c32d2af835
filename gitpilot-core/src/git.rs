//! Git adapter for the action layer.
//!
//! Commits go through the `git` binary so hooks, identity and ignore rules
//! behave exactly as they do for the user's own commits. Every call runs with
//! the bound working tree as its current directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use gitpilot_error::{Error, ErrorKind, Result};
use tracing::{debug, instrument, warn};

/// Wrapper for executing git commands in one working tree.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Find the top level of the working tree containing `dir`.
    #[instrument]
    pub fn discover(dir: &Path) -> Result<PathBuf> {
        let output = run_in(dir, &["rev-parse", "--is-inside-work-tree", "--show-toplevel"])
            .map_err(|e| e.with_operation("git::discover"))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = stdout.lines();

        if !output.status.success() || lines.next() != Some("true") {
            debug!(stderr = %String::from_utf8_lossy(&output.stderr).trim(), "not a working tree");
            return Err(Error::not_a_working_tree(dir.display().to_string())
                .with_operation("git::discover"));
        }

        let toplevel = lines
            .next()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| {
                Error::not_a_working_tree(dir.display().to_string())
                    .with_operation("git::discover")
            })?;
        Ok(PathBuf::from(toplevel))
    }

    /// Return the checked-out branch name (errors on detached HEAD).
    ///
    /// Works on an unborn branch, so the first commit of a fresh repository
    /// goes through the same path as every later one.
    #[instrument(skip_all)]
    pub fn current_branch(&self) -> Result<String> {
        let output = self.run(&["symbolic-ref", "--short", "-q", "HEAD"])?;
        if !output.status.success() {
            warn!("detached HEAD detected");
            return Err(Error::detached_head().with_operation("git::current_branch"));
        }
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(branch = %name, "current branch");
        Ok(name)
    }

    /// Stage all changes: added, modified and deleted (respects .gitignore).
    pub fn add_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    /// True if there is anything staged for commit.
    pub fn has_staged_changes(&self) -> Result<bool> {
        let output = self.run(&["diff", "--cached", "--quiet"])?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(failure(&["diff", "--cached", "--quiet"], &output)),
        }
    }

    /// Commit whatever is staged with the given message.
    #[instrument(skip_all)]
    pub fn commit(&self, message: &str) -> Result<()> {
        debug!("committing staged changes");
        self.run_checked(&["commit", "--quiet", "-m", message])?;
        Ok(())
    }

    /// Short id of the HEAD commit.
    pub fn head_short_sha(&self) -> Result<String> {
        let out = self.run_capture(&["rev-parse", "--short", "HEAD"])?;
        Ok(out.trim().to_string())
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(failure(args, &output));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        run_in(&self.workdir, args)
    }
}

fn run_in(dir: &Path, args: &[&str]) -> Result<Output> {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| {
            Error::new(ErrorKind::VcsFailed, format!("failed to run git {}: {}", args.join(" "), e))
                .with_context("command", args.join(" "))
                .set_source(e)
        })
}

fn failure(args: &[&str], output: &Output) -> Error {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    // `git commit` reports some failures (e.g. nothing added) on stdout.
    let detail = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
    Error::vcs_failed(
        args.join(" "),
        format!("git {} failed: {}", args.join(" "), detail),
    )
}
