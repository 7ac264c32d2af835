//! # Workspace
//!
//! The action layer: one bound git working tree and the side effects the
//! model may perform in it. Every public operation returns an
//! [`ActionResult`]; failures are folded into error results here and never
//! propagate further.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use gitpilot_error::{Error, Result};
use tracing::{debug, info, instrument};

use crate::action::{Action, ActionResult};
use crate::git::Git;

/// A git working tree bound for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    /// `root` with symlinks resolved
    real_root: PathBuf,
    git: Git,
}

impl Workspace {
    /// Bind the working tree containing `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let root = Git::discover(dir.as_ref()).map_err(|e| e.with_operation("workspace::open"))?;
        let real_root = root
            .canonicalize()
            .map_err(|e| Error::from(e).with_operation("workspace::open"))?;
        info!(root = %root.display(), "bound working tree");
        Ok(Self {
            git: Git::new(&root),
            root,
            real_root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run a parsed action.
    pub fn execute(&self, action: &Action) -> ActionResult {
        match action {
            Action::WriteFile(args) => self.write_file(&args.file_path, &args.content),
            Action::ReadFile(args) => self.read_file(&args.file_path),
            Action::CommitChanges(args) => self.commit_changes(&args.message),
        }
    }

    /// Create or overwrite `path` with `content`, creating parent directories.
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub fn write_file(&self, path: &str, content: &str) -> ActionResult {
        ActionResult::from_outcome(self.try_write_file(path, content))
    }

    #[instrument(skip(self))]
    pub fn read_file(&self, path: &str) -> ActionResult {
        ActionResult::from_outcome(self.try_read_file(path))
    }

    /// Stage everything and commit on the checked-out branch.
    #[instrument(skip(self))]
    pub fn commit_changes(&self, message: &str) -> ActionResult {
        ActionResult::from_outcome(self.try_commit_changes(message))
    }

    fn try_write_file(&self, path: &str, content: &str) -> Result<ActionResult> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::from(e).with_operation("workspace::write_file"))?;
        }
        std::fs::write(&full, content)
            .map_err(|e| Error::from(e).with_operation("workspace::write_file"))?;
        debug!(path = %full.display(), "wrote file");
        Ok(ActionResult::success(format!("File {} has been modified", path)))
    }

    fn try_read_file(&self, path: &str) -> Result<ActionResult> {
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Err(Error::file_not_found(path).with_operation("workspace::read_file"));
        }
        let content = std::fs::read_to_string(&full)
            .map_err(|e| Error::from(e).with_operation("workspace::read_file"))?;
        Ok(ActionResult::success(format!("Read {}", path)).with_content(content))
    }

    fn try_commit_changes(&self, message: &str) -> Result<ActionResult> {
        if message.trim().is_empty() {
            return Err(Error::invalid_argument("commit message must not be empty")
                .with_operation("workspace::commit_changes"));
        }

        let branch = self.git.current_branch()?;
        self.git.add_all()?;
        if !self.git.has_staged_changes()? {
            return Err(Error::nothing_to_commit()
                .with_operation("workspace::commit_changes")
                .with_context("branch", branch));
        }
        self.git.commit(message)?;
        let sha = self.git.head_short_sha()?;
        info!(%branch, %sha, "committed changes");

        Ok(ActionResult::success(format!(
            "Changes committed with message: {} ({} on {})",
            message, sha, branch
        )))
    }

    /// Resolve a model-supplied path against the root.
    ///
    /// The path is normalized lexically first so it also works for files that
    /// do not exist yet. Absolute paths and `..` that climbs above the root are
    /// rejected. The part of the result that already exists is then resolved
    /// on disk, so a symlink cannot lead out of the tree or into `.git`.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let mut parts: Vec<&OsStr> = Vec::new();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(part) => parts.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if parts.pop().is_none() {
                        return Err(Error::path_escapes_tree(path));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::path_escapes_tree(path));
                }
            }
        }

        if parts.is_empty() {
            return Err(Error::invalid_argument(format!("'{}' does not name a file", path))
                .with_context("path", path));
        }
        if parts.first().is_some_and(|p| is_git_dir(p)) {
            return Err(Error::path_escapes_tree(path));
        }

        let mut full = self.root.clone();
        full.extend(parts);
        self.ensure_real_path_inside(path, &full)?;
        Ok(full)
    }

    fn ensure_real_path_inside(&self, path: &str, full: &Path) -> Result<()> {
        // Deepest ancestor that exists; a dangling symlink counts as existing.
        let mut existing = full;
        while existing.symlink_metadata().is_err() {
            match existing.parent() {
                Some(parent) => existing = parent,
                None => break,
            }
        }

        let escapes = || {
            Error::path_escapes_tree(path)
                .with_operation("workspace::resolve")
                .with_context("resolved", existing.display().to_string())
        };
        let real = existing.canonicalize().map_err(|_| escapes())?;
        let inside = real.strip_prefix(&self.real_root).map_err(|_| escapes())?;
        if inside
            .components()
            .next()
            .is_some_and(|c| is_git_dir(c.as_os_str()))
        {
            return Err(escapes());
        }
        debug!(path, real = %real.display(), "resolved path");
        Ok(())
    }
}

fn is_git_dir(name: &OsStr) -> bool {
    name.to_str().is_some_and(|n| n.eq_ignore_ascii_case(".git"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionStatus;
    use crate::test_support::{commit_count, git_stdout, init_repo};

    #[test]
    fn test_open_rejects_plain_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = Workspace::open(dir.path()).unwrap_err();
        assert_eq!(err.kind(), gitpilot_error::ErrorKind::NotAWorkingTree);
    }

    #[test]
    fn test_write_then_read_round_trips() {
        let repo = init_repo();
        let ws = Workspace::open(repo.path()).unwrap();

        for (path, content) in [
            ("notes.txt", "hello"),
            ("empty.txt", ""),
            ("unicode.md", "héllo wörld\n\ttabs and ✓\n"),
        ] {
            assert!(ws.write_file(path, content).is_success());
            let read = ws.read_file(path);
            assert!(read.is_success());
            assert_eq!(read.content.as_deref(), Some(content));
        }
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let repo = init_repo();
        let ws = Workspace::open(repo.path()).unwrap();

        let result = ws.write_file("src/deep/nested/mod.rs", "pub fn f() {}");
        assert_eq!(result.status, ActionStatus::Success);
        assert_eq!(result.message, "File src/deep/nested/mod.rs has been modified");
        assert_eq!(
            std::fs::read_to_string(repo.path().join("src/deep/nested/mod.rs")).unwrap(),
            "pub fn f() {}"
        );
    }

    #[test]
    fn test_write_overwrites() {
        let repo = init_repo();
        let ws = Workspace::open(repo.path()).unwrap();

        ws.write_file("a.txt", "first version, longer");
        ws.write_file("a.txt", "second");
        assert_eq!(ws.read_file("a.txt").content.as_deref(), Some("second"));
    }

    #[test]
    fn test_read_missing_file_is_error_result() {
        let repo = init_repo();
        let ws = Workspace::open(repo.path()).unwrap();

        let result = ws.read_file("missing.txt");
        assert_eq!(result.status, ActionStatus::Error);
        assert_eq!(result.message, "File missing.txt does not exist");
        assert!(result.content.is_none());
    }

    #[test]
    fn test_paths_cannot_escape_root() {
        let repo = init_repo();
        let ws = Workspace::open(repo.path()).unwrap();

        for path in [
            "../outside.txt",
            "a/../../outside.txt",
            "/etc/passwd",
            ".git/config",
            ".GIT/config",
            "",
        ] {
            let result = ws.write_file(path, "x");
            assert_eq!(result.status, ActionStatus::Error, "path {:?}", path);
        }
        assert!(!repo.path().parent().unwrap().join("outside.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_cannot_escape_root() {
        use std::os::unix::fs::symlink;

        let repo = init_repo();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "secret").unwrap();
        symlink(outside.path(), repo.path().join("link")).unwrap();
        symlink(outside.path().join("secret.txt"), repo.path().join("secret_link")).unwrap();
        symlink(outside.path().join("gone.txt"), repo.path().join("dangling")).unwrap();
        symlink(repo.path().join(".git"), repo.path().join("git_link")).unwrap();
        let ws = Workspace::open(repo.path()).unwrap();

        let result = ws.write_file("link/pwned.txt", "x");
        assert_eq!(result.status, ActionStatus::Error);
        assert!(!outside.path().join("pwned.txt").exists());

        assert_eq!(ws.write_file("secret_link", "x").status, ActionStatus::Error);
        assert_eq!(ws.read_file("secret_link").status, ActionStatus::Error);
        assert_eq!(
            std::fs::read_to_string(outside.path().join("secret.txt")).unwrap(),
            "secret"
        );

        assert_eq!(ws.write_file("dangling", "x").status, ActionStatus::Error);
        assert!(!outside.path().join("gone.txt").exists());

        assert_eq!(ws.write_file("git_link/config", "x").status, ActionStatus::Error);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_inside_root_are_followed() {
        let repo = init_repo();
        std::fs::create_dir(repo.path().join("docs")).unwrap();
        std::os::unix::fs::symlink("docs", repo.path().join("docs_link")).unwrap();
        let ws = Workspace::open(repo.path()).unwrap();

        assert!(ws.write_file("docs_link/a.md", "# A").is_success());
        assert_eq!(
            std::fs::read_to_string(repo.path().join("docs/a.md")).unwrap(),
            "# A"
        );
    }

    #[test]
    fn test_resolve_normalizes_inside_root() {
        let repo = init_repo();
        let ws = Workspace::open(repo.path()).unwrap();

        let resolved = ws.resolve("./a/b/../c.txt").unwrap();
        assert_eq!(resolved, ws.root().join("a").join("c.txt"));
    }

    #[test]
    fn test_commit_stages_everything() {
        let repo = init_repo();
        let ws = Workspace::open(repo.path()).unwrap();

        ws.write_file("notes.txt", "hello");
        ws.write_file("doomed.txt", "bye");
        assert!(ws.commit_changes("first").is_success());

        std::fs::remove_file(repo.path().join("doomed.txt")).unwrap();
        ws.write_file("notes.txt", "hello again");
        let result = ws.commit_changes("second");
        assert!(result.is_success(), "{}", result.message);
        assert!(result.message.starts_with("Changes committed with message: second"));

        assert_eq!(commit_count(repo.path()), 2);
        assert_eq!(git_stdout(repo.path(), &["ls-tree", "--name-only", "HEAD"]), "notes.txt");
        assert_eq!(git_stdout(repo.path(), &["show", "HEAD:notes.txt"]), "hello again");
    }

    #[test]
    fn test_commit_with_nothing_staged_is_error_result() {
        let repo = init_repo();
        let ws = Workspace::open(repo.path()).unwrap();

        let result = ws.commit_changes("empty");
        assert_eq!(result.status, ActionStatus::Error);
        assert_eq!(result.message, "nothing to commit, working tree clean");
        assert_eq!(commit_count(repo.path()), 0);
    }

    #[test]
    fn test_commit_rejects_empty_message() {
        let repo = init_repo();
        let ws = Workspace::open(repo.path()).unwrap();
        ws.write_file("a.txt", "a");

        let result = ws.commit_changes("   ");
        assert_eq!(result.status, ActionStatus::Error);
        assert_eq!(commit_count(repo.path()), 0);
    }
}
