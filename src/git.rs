//! Read-only `git` plumbing used to look at project repositories.
//!
//! These helpers shell out to the system `git` binary. Nothing here
//! fetches, checks out or otherwise changes a repository; they only read
//! objects at a given revision.

use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};

/// Runs `git <args>` inside `dir` and returns its standard output.
fn run(project: &str, dir: &Path, args: &[&str]) -> Result<String> {
    let command = format!("git {}", args.join(" "));
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| Error::GitCommand {
            project: project.to_string(),
            command: command.clone(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::GitCommand {
            project: project.to_string(),
            command,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Checks whether `dir` is the top level of a git working tree.
pub fn is_toplevel(project: &str, dir: &Path) -> bool {
    if !dir.is_dir() {
        return false;
    }
    // --show-cdup prints nothing at the top level
    matches!(run(project, dir, &["rev-parse", "--show-cdup"]), Ok(out) if out.trim().is_empty())
}

/// Object type of `path` at `rev`, such as `blob` or `tree`.
///
/// Returns `None` if the path does not exist at that revision.
pub fn object_type(project: &str, dir: &Path, rev: &str, path: &str) -> Result<Option<String>> {
    let out = run(project, dir, &["ls-tree", rev, path])?;
    // <mode> SP <type> SP <object> TAB <file>
    Ok(out.split_whitespace().nth(1).map(str::to_string))
}

/// Contents of the file `path` at `rev`.
pub fn show(project: &str, dir: &Path, rev: &str, path: &str) -> Result<String> {
    run(project, dir, &["show", &format!("{}:{}", rev, path)])
}

/// Names of the entries of directory `path` at `rev`, relative to the
/// repository root, in git's order.
pub fn list_dir(project: &str, dir: &Path, rev: &str, path: &str) -> Result<Vec<String>> {
    let dir_spec = format!("{}/", path.trim_end_matches('/'));
    let out = run(project, dir, &["ls-tree", "--name-only", rev, &dir_spec])?;
    Ok(out
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Resolves `rev` to the SHA of the commit it points to.
pub fn resolve_commit(project: &str, dir: &Path, rev: &str) -> Result<String> {
    let out = run(project, dir, &["rev-parse", &format!("{}^{{commit}}", rev)])?;
    Ok(out.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directory_is_not_toplevel() {
        assert!(!is_toplevel("p", Path::new("/nonexistent/west-manifest-test")));
    }

    #[test]
    fn test_plain_directory_is_not_toplevel() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_toplevel("p", dir.path()));
    }

    #[test]
    fn test_failure_reports_command() {
        let dir = tempfile::tempdir().unwrap();
        match show("p", dir.path(), "refs/heads/manifest-rev", "west.yml") {
            Err(Error::GitCommand {
                project, command, ..
            }) => {
                assert_eq!(project, "p");
                assert!(command.starts_with("git show refs/heads/manifest-rev:west.yml"));
            }
            other => panic!("expected git failure, got {:?}", other.map(|_| ())),
        }
    }
}
