//! # Import Content Sources
//!
//! Resolving `import:` on a project needs manifest text from that project's
//! repository. This module defines the two seams through which the
//! resolver gets it:
//!
//! - **`ContentProvider`**: direct, read-only access to cloned projects at
//!   a pinned revision. [`GitProvider`] reads from the working trees of a
//!   workspace with `git`; [`MemoryProvider`] serves content held in memory,
//!   for offline callers and tests.
//!
//! - **`Importer`**: a caller-supplied fallback that is asked for content
//!   when the provider cannot supply it, because the project is not cloned
//!   or its pinned revision has not been fetched. The default,
//!   [`FailingImporter`], turns that situation into
//!   [`Error::ImportFailed`].
//!
//! Both are called strictly one at a time, in depth-first resolution order.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{Error, Result};
use crate::git;
use crate::project::Project;
use crate::validate::normalize_path;

/// Read-only access to the manifest content of projects.
pub trait ContentProvider {
    /// True if the project has a working tree to read from.
    fn is_cloned(&self, project: &Project) -> bool;

    /// Returns the text of `path` at `revision`.
    ///
    /// If `path` is a directory, returns the text of each `.yml` or `.yaml`
    /// file directly inside it, in name order. `Ok(None)` means the path
    /// does not exist at that revision.
    fn content_at(&self, project: &Project, path: &str, revision: &str)
        -> Result<Option<Vec<String>>>;

    /// Resolves `revision` to an exact commit SHA.
    fn sha(&self, project: &Project, revision: &str) -> Result<String>;
}

fn is_manifest_file(name: &str) -> bool {
    name.ends_with(".yml") || name.ends_with(".yaml")
}

/// Provider backed by the `git` working trees of a workspace.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitProvider;

impl ContentProvider for GitProvider {
    fn is_cloned(&self, project: &Project) -> bool {
        project
            .abspath()
            .map(|dir| git::is_toplevel(&project.name, &dir))
            .unwrap_or(false)
    }

    fn content_at(
        &self,
        project: &Project,
        path: &str,
        revision: &str,
    ) -> Result<Option<Vec<String>>> {
        let Some(dir) = project.abspath() else {
            return Ok(None);
        };
        let path = normalize_path(path);
        match git::object_type(&project.name, &dir, revision, &path)?.as_deref() {
            None => Ok(None),
            Some("blob") => Ok(Some(vec![git::show(&project.name, &dir, revision, &path)?])),
            Some("tree") => {
                let mut contents = Vec::new();
                for entry in git::list_dir(&project.name, &dir, revision, &path)? {
                    if is_manifest_file(&entry) {
                        contents.push(git::show(&project.name, &dir, revision, &entry)?);
                    }
                }
                Ok(Some(contents))
            }
            Some(other) => Err(Error::malformed(
                format!("project {}", project.name),
                format!(
                    "can't decipher path {} at revision {} (git type={})",
                    path, revision, other
                ),
            )),
        }
    }

    fn sha(&self, project: &Project, revision: &str) -> Result<String> {
        let dir = project.abspath().ok_or_else(|| Error::GitCommand {
            project: project.name.clone(),
            command: format!("git rev-parse {}^{{commit}}", revision),
            stderr: "project has no location on disk".to_string(),
        })?;
        git::resolve_commit(&project.name, &dir, revision)
    }
}

/// Provider serving manifest content held in memory.
///
/// Content is keyed by project name and file path. Revisions are not
/// modelled: every lookup sees the single stored version. The manifest
/// repository always counts as cloned.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    files: HashMap<String, BTreeMap<String, String>>,
    cloned: HashSet<String>,
    shas: HashMap<String, String>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a project as cloned without giving it any content.
    pub fn add_project(&mut self, project: &str) -> &mut Self {
        self.cloned.insert(project.to_string());
        self
    }

    /// Stores a file for a project, which then counts as cloned.
    pub fn add_file(&mut self, project: &str, path: &str, content: &str) -> &mut Self {
        self.cloned.insert(project.to_string());
        self.files
            .entry(project.to_string())
            .or_default()
            .insert(normalize_path(path), content.to_string());
        self
    }

    /// Records the commit a project's pinned revision resolves to.
    pub fn set_sha(&mut self, project: &str, sha: &str) -> &mut Self {
        self.cloned.insert(project.to_string());
        self.shas.insert(project.to_string(), sha.to_string());
        self
    }
}

impl ContentProvider for MemoryProvider {
    fn is_cloned(&self, project: &Project) -> bool {
        project.is_manifest() || self.cloned.contains(&project.name)
    }

    fn content_at(
        &self,
        project: &Project,
        path: &str,
        _revision: &str,
    ) -> Result<Option<Vec<String>>> {
        let Some(files) = self.files.get(&project.name) else {
            return Ok(None);
        };
        let path = normalize_path(path);
        if let Some(content) = files.get(&path) {
            return Ok(Some(vec![content.clone()]));
        }
        let prefix = format!("{}/", path);
        if !files.keys().any(|name| name.starts_with(&prefix)) {
            return Ok(None);
        }
        // a directory without manifest files imports nothing
        let contents = files
            .iter()
            .filter_map(|(name, content)| {
                let rest = name.strip_prefix(&prefix)?;
                (!rest.contains('/') && is_manifest_file(rest)).then(|| content.clone())
            })
            .collect();
        Ok(Some(contents))
    }

    fn sha(&self, project: &Project, revision: &str) -> Result<String> {
        self.shas
            .get(&project.name)
            .cloned()
            .ok_or_else(|| Error::GitCommand {
                project: project.name.clone(),
                command: format!("git rev-parse {}^{{commit}}", revision),
                stderr: format!("unknown revision {}", revision),
            })
    }
}

/// Fallback source of import content for projects the provider cannot read.
///
/// Returning `Ok(None)` makes the import a no-op.
pub trait Importer {
    fn import(&mut self, project: &Project, path: &str) -> Result<Option<Vec<String>>>;
}

impl<F> Importer for F
where
    F: FnMut(&Project, &str) -> Result<Option<Vec<String>>>,
{
    fn import(&mut self, project: &Project, path: &str) -> Result<Option<Vec<String>>> {
        self(project, path)
    }
}

/// Importer that refuses every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingImporter;

impl Importer for FailingImporter {
    fn import(&mut self, project: &Project, path: &str) -> Result<Option<Vec<String>>> {
        Err(Error::ImportFailed {
            project: Some(project.name_and_path()),
            target: path.to_string(),
        })
    }
}
