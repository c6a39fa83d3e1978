//! Shared test utilities for integration tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! #[serial]
//! fn test_example() {
//!     let ws = Workspace::new().with_manifest(manifests::MINIMAL);
//!     let manifest = Manifest::from_topdir(ws.path()).unwrap();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;
    pub use serial_test::serial;

    #[allow(unused_imports)]
    pub use super::manifests;
    pub use super::Workspace;
}

/// Common manifest snippets for testing.
#[allow(dead_code)]
#[allow(dead_code)]
pub mod manifests {
    /// A manifest with one remote and two plain projects.
    pub const MINIMAL: &str = r#"
manifest:
  remotes:
    - name: upstream
      url-base: https://example.com
  defaults:
    remote: upstream
  projects:
    - name: zephyr
      revision: main
    - name: hal
      path: modules/hal
  self:
    path: mf
"#;
}

/// A workspace on disk: a top directory with `.west/config` and a
/// manifest repository at `mf`.
///
/// Creating one points the system and global configuration layers at
/// files that do not exist, so tests only see the local layer. Tests
/// using it must be `#[serial]`.
#[allow(dead_code)]
pub struct Workspace {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
#[allow(dead_code)]
impl Workspace {
    /// Create a workspace whose `manifest.path` is `mf`.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        std::env::set_var("WEST_CONFIG_SYSTEM", temp_dir.path().join("no-system-config"));
        std::env::set_var("WEST_CONFIG_GLOBAL", temp_dir.path().join("no-global-config"));
        std::env::remove_var("WEST_CONFIG_LOCAL");
        let ws = Self { temp_dir };
        ws.with_config("[manifest]\npath = mf\nfile = west.yml\n")
    }

    /// Replace `.west/config` with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.with_file(".west/config", content)
    }

    /// Write the manifest repository's `west.yml`.
    pub fn with_manifest(self, content: &str) -> Self {
        self.with_file("mf/west.yml", content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Turn directory `path` into a git repository holding `files`, with
    /// a `manifest-rev` branch at its only commit.
    pub fn with_git_project(self, path: &str, files: &[(&str, &str)]) -> Self {
        let mut ws = self;
        for (name, content) in files {
            ws = ws.with_file(&format!("{}/{}", path, name), content);
        }
        let dir = ws.path().join(path);
        git(&dir, &["init", "-q"]);
        git(&dir, &["add", "-A"]);
        git(
            &dir,
            &[
                "-c",
                "user.name=Test",
                "-c",
                "user.email=test@example.com",
                "commit",
                "-q",
                "-m",
                "initial",
            ],
        );
        git(&dir, &["branch", "manifest-rev"]);
        ws
    }

    /// Get the workspace top directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the manifest repository directory.
    pub fn manifest_dir(&self) -> PathBuf {
        self.temp_dir.path().join("mf")
    }

    /// Create a child path in the workspace.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        std::env::remove_var("WEST_CONFIG_SYSTEM");
        std::env::remove_var("WEST_CONFIG_GLOBAL");
    }
}

/// Run git in `dir`, panicking on failure.
#[allow(dead_code)]
#[allow(dead_code)]
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
