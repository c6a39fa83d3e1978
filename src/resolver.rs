//! # Import Resolution
//!
//! This module turns a root manifest document, plus whatever its imports
//! reach, into one flat project list. It is the core of the crate.
//!
//! ## Process
//!
//! Every document, whether the root or an imported fragment, is resolved
//! by [`Resolver::resolve_document`] in the same order:
//!
//! 1.  **Validation**: the version and schema checks of
//!     [`parse_document`].
//! 2.  **Self section**: records the manifest repository path and
//!     extension commands. A `self: import:` is resolved first, from the
//!     local filesystem, relative to the repository holding the document.
//! 3.  **Group filter**: the document's `group-filter:` batch is appended
//!     to the shared [`DirectiveLog`].
//! 4.  **Projects**: each project is built and, if it passes the import
//!     filters in force, inserted unless a project with the same name was
//!     inserted before ("first writer wins"). Once the whole list has been
//!     inserted, the imports of the newly inserted projects are resolved in
//!     list order.
//!
//! All documents share one mutable [`Resolver`], threaded through the
//! recursion by `&mut self`. What changes from one document to the next
//! (its source, the composed import filter and path prefix, the directory
//! self imports are relative to) lives in a [`Frame`].
//!
//! ## Cycle Detection
//!
//! The resolver keeps a stack of the imports currently being resolved,
//! keyed by the repository they are read from and their target. Entering
//! an import that is already on the stack fails with
//! [`Error::ImportTooDeep`] and reports the loop, e.g.
//! `self:/ws/mf/a.yml -> self:/ws/mf/b.yml -> self:/ws/mf/a.yml`.

use serde_yaml::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::defaults::{
    DEFAULT_REMOTE_NAME, DEFAULT_REVISION, MAX_IMPORT_DEPTH, QUAL_MANIFEST_REV_BRANCH,
};
use crate::document::{parse_document, DefaultsData, ManifestSource, ProjectData, Scalar};
use crate::error::{Error, Result};
use crate::group_filter::{
    DirectiveLog, FilterVerdict, GroupFilter, GroupFilterDirective, ProjectFilter,
};
use crate::import_map::{compose_prefix, ImportFilter, ImportMap, ImportSpec};
use crate::project::{merge_west_commands, Project, Submodules};
use crate::repository::{ContentProvider, Importer};
use crate::validate::{
    check_project_name, check_project_path, compose_path, is_absolute_like, is_group,
    normalize_path,
};

/// How imports are treated during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Resolve every import
    #[default]
    Default,
    /// Skip every import; path prefixes still apply
    Ignore,
    /// Always use the importer for project imports, even for cloned projects
    ForceProjects,
    /// Skip imports on projects, but still resolve `self: import:`
    IgnoreProjects,
}

/// Projects by name, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ProjectMap {
    projects: Vec<Project>,
    index: HashMap<String, usize>,
}

impl ProjectMap {
    /// Inserts `project` unless its name is taken; returns whether it was.
    pub fn insert(&mut self, project: Project) -> bool {
        if self.index.contains_key(&project.name) {
            return false;
        }
        self.index.insert(project.name.clone(), self.projects.len());
        self.projects.push(project);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Project> {
        self.index.get(name).map(|&i| &self.projects[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Project> {
        self.index.get(name).map(|&i| &mut self.projects[i])
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn into_vec(self) -> Vec<Project> {
        self.projects
    }
}

/// The outcome of resolving a root document.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Every resolved project except the manifest repository, in order
    pub projects: Vec<Project>,
    /// `west-commands` belonging to the manifest repository
    pub manifest_west_commands: Vec<String>,
    pub directives: DirectiveLog,
    /// Schema version declared by the root document
    pub schema_version: String,
    /// The root document's own `group-filter:`, if any
    pub top_level_group_filter: Option<GroupFilter>,
    /// `self: path:` of the root document
    pub self_path: Option<String>,
    /// `self: userdata:` of the root document
    pub userdata: Option<Value>,
    pub has_imports: bool,
}

/// Per-document state that changes as resolution descends into imports.
#[derive(Debug, Clone)]
struct Frame {
    source: ManifestSource,
    filter: ImportFilter,
    path_prefix: String,
    /// Directory that `self: import:` paths are relative to
    repo_abspath: Option<PathBuf>,
    /// Project the document was read from; `None` for the manifest repository
    owner: Option<String>,
}

impl Frame {
    fn malformed(&self, message: impl Into<String>) -> Error {
        Error::malformed(self.source.to_string(), message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ImportKey {
    owner: Option<String>,
    target: String,
}

impl fmt::Display for ImportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(project) => write!(f, "{}:{}", project, self.target),
            None => write!(f, "self:{}", self.target),
        }
    }
}

/// What a resolved document contributes besides projects.
struct DocumentSummary {
    schema_version: String,
    group_filter: Option<GroupFilter>,
    self_path: Option<String>,
    userdata: Option<Value>,
}

struct Defaults {
    remote: Option<String>,
    revision: String,
}

/// Shared state of one top-level resolution.
pub struct Resolver<'a> {
    projects: ProjectMap,
    directives: DirectiveLog,
    project_filter: &'a ProjectFilter,
    provider: &'a dyn ContentProvider,
    importer: &'a mut dyn Importer,
    mode: ImportMode,
    topdir: Option<PathBuf>,
    resolving: Vec<ImportKey>,
    has_imports: bool,
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// `.yml` and `.yaml` files directly inside `dir`, sorted by name.
fn manifest_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_file() && (name.ends_with(".yml") || name.ends_with(".yaml")) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn validated_group_filter(raw: &[Scalar]) -> std::result::Result<GroupFilter, String> {
    raw.iter()
        .map(|item| match item {
            Scalar::Str(token) => GroupFilterDirective::parse(token)
                .map_err(|complaint| format!("invalid group-filter item: {}", complaint)),
            other => Err(format!(
                "group-filter item {} does not start with \"+\" or \"-\"",
                other
            )),
        })
        .collect()
}

impl<'a> Resolver<'a> {
    pub fn new(
        provider: &'a dyn ContentProvider,
        importer: &'a mut dyn Importer,
        project_filter: &'a ProjectFilter,
        mode: ImportMode,
        topdir: Option<PathBuf>,
    ) -> Self {
        Resolver {
            projects: ProjectMap::default(),
            directives: DirectiveLog::default(),
            project_filter,
            provider,
            importer,
            mode,
            topdir,
            resolving: Vec::new(),
            has_imports: false,
        }
    }

    /// Resolves a root document.
    ///
    /// `repo_abspath` is the manifest repository on disk, which `self:
    /// import:` paths are relative to. Without it, self imports fail.
    pub fn resolve(
        mut self,
        text: &str,
        source: ManifestSource,
        repo_abspath: Option<PathBuf>,
    ) -> Result<Resolution> {
        if let Some(file) = source.file() {
            self.resolving.push(ImportKey {
                owner: None,
                target: canonical(file).display().to_string(),
            });
        }
        let frame = Frame {
            source,
            filter: ImportFilter::default(),
            path_prefix: String::new(),
            repo_abspath,
            owner: None,
        };

        let mut west_commands = Vec::new();
        let summary = self.resolve_document(&frame, text, &mut west_commands)?;

        Ok(Resolution {
            projects: self.projects.into_vec(),
            manifest_west_commands: west_commands,
            directives: self.directives,
            schema_version: summary.schema_version,
            top_level_group_filter: summary.group_filter,
            self_path: summary.self_path,
            userdata: summary.userdata,
            has_imports: self.has_imports,
        })
    }

    fn enter(&mut self, key: ImportKey) -> Result<()> {
        let start = match self.resolving.iter().position(|k| *k == key) {
            Some(start) => start,
            None if self.resolving.len() >= MAX_IMPORT_DEPTH => 0,
            None => {
                self.resolving.push(key);
                return Ok(());
            }
        };
        let chain = self.resolving[start..]
            .iter()
            .chain(std::iter::once(&key))
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        Err(Error::ImportTooDeep { chain })
    }

    fn leave(&mut self) {
        self.resolving.pop();
    }

    fn resolve_document(
        &mut self,
        frame: &Frame,
        text: &str,
        west_commands: &mut Vec<String>,
    ) -> Result<DocumentSummary> {
        log::debug!("loading {}", frame.source);
        let doc = parse_document(text, &frame.source)?;
        let data = doc.data;

        let mut self_path = None;
        let mut userdata = None;
        if let Some(me) = data.self_section {
            if let Some(path) = me.path {
                if path.is_empty() {
                    return Err(frame.malformed("\"self: path:\" must be nonempty if present"));
                }
                self_path = Some(path);
            }
            if let Some(raw) = &me.import {
                let spec = ImportSpec::from_self_value(raw).map_err(|m| frame.malformed(m))?;
                self.import_from_self(frame, &spec, west_commands)?;
            }
            if let Some(cmds) = me.west_commands {
                *west_commands = merge_west_commands(west_commands, &cmds.into_vec());
            }
            userdata = me.userdata;
        }

        let group_filter = match data.group_filter {
            None => None,
            Some(raw) if raw.is_empty() => {
                return Err(frame.malformed("\"manifest: group-filter:\" may not be empty"))
            }
            Some(raw) => {
                let filter = validated_group_filter(&raw).map_err(|m| frame.malformed(m))?;
                self.directives.append(filter.clone());
                Some(filter)
            }
        };

        let mut url_bases = HashMap::new();
        for remote in data.remotes.unwrap_or_default() {
            url_bases.insert(remote.name, remote.url_base);
        }
        let defaults = load_defaults(frame, data.defaults.unwrap_or_default(), &url_bases)?;
        self.load_projects(frame, data.projects.unwrap_or_default(), &url_bases, &defaults)?;

        log::debug!("loaded {}", frame.source);
        Ok(DocumentSummary {
            schema_version: doc.schema_version,
            group_filter,
            self_path,
            userdata,
        })
    }

    fn load_projects(
        &mut self,
        frame: &Frame,
        declared: Vec<ProjectData>,
        url_bases: &HashMap<String, String>,
        defaults: &Defaults,
    ) -> Result<()> {
        let mut names = HashSet::new();
        let mut pending_imports = Vec::new();

        for pd in &declared {
            let (project, spec) = self.load_project(frame, pd, url_bases, defaults)?;
            if !frame.filter.admits(&project.name, &project.path) {
                log::debug!(
                    "project {} in {} excluded by import map filters",
                    project.name_and_path(),
                    frame.source
                );
                continue;
            }
            if !names.insert(project.name.clone()) {
                return Err(frame.malformed(format!(
                    "project name {} is already used",
                    project.name
                )));
            }

            let name = project.name.clone();
            if !self.projects.insert(project) {
                log::debug!(
                    "project {} from {} already defined; ignoring this declaration",
                    name,
                    frame.source
                );
                continue;
            }
            if spec.is_import() {
                match self.mode {
                    ImportMode::Ignore | ImportMode::IgnoreProjects => {
                        log::debug!("ignoring import of project {} ({:?})", name, self.mode)
                    }
                    ImportMode::Default | ImportMode::ForceProjects => {
                        pending_imports.push((name, spec))
                    }
                }
            }
        }

        for (name, spec) in pending_imports {
            self.import_from_project(frame, &name, &spec)?;
        }
        Ok(())
    }

    fn load_project(
        &self,
        frame: &Frame,
        pd: &ProjectData,
        url_bases: &HashMap<String, String>,
        defaults: &Defaults,
    ) -> Result<(Project, ImportSpec)> {
        let name = pd.name.as_str();
        check_project_name(name).map_err(|m| frame.malformed(m))?;

        let (url, remote_name) = match (&pd.url, &pd.remote) {
            (Some(_), Some(remote)) => {
                return Err(frame.malformed(format!(
                    "project {} has both \"url\" and \"remote: {}\"; only one may be given",
                    name, remote
                )))
            }
            (Some(_), None) if pd.repo_path.is_some() => {
                return Err(frame.malformed(format!(
                    "project {} has both \"url\" and \"repo-path\"; repo-path requires a remote",
                    name
                )))
            }
            (Some(url), None) => (url.clone(), DEFAULT_REMOTE_NAME.to_string()),
            (None, remote) => {
                let remote = remote
                    .as_deref()
                    .or(defaults.remote.as_deref())
                    .ok_or_else(|| {
                        frame.malformed(format!(
                            "project {} has no remote or url and no default remote is set",
                            name
                        ))
                    })?;
                let url_base = url_bases.get(remote).ok_or_else(|| {
                    frame.malformed(format!("project {} remote {} is not defined", name, remote))
                })?;
                let repo_path = pd.repo_path.as_deref().unwrap_or(name);
                (format!("{}/{}", url_base, repo_path), remote.to_string())
            }
        };

        let spec = match &pd.import {
            Some(raw) => ImportSpec::from_value(raw)
                .map_err(|m| frame.malformed(format!("project {}: {}", name, m)))?,
            None => ImportSpec::NoImport,
        };

        let mut groups = Vec::new();
        for group in pd.groups.iter().flatten() {
            if !is_group(group) {
                return Err(frame.malformed(format!(
                    "project {}: invalid group {:?}",
                    name,
                    group.to_string()
                )));
            }
            groups.push(group.to_string());
        }
        if !groups.is_empty() && spec.is_import() {
            return Err(frame.malformed(format!(
                "project {}: \"groups\" cannot be combined with \"import\"",
                name
            )));
        }

        let submodules = match &pd.submodules {
            Some(raw) => Submodules::from_value(raw)
                .map_err(|m| frame.malformed(format!("project {}: {}", name, m)))?,
            None => Submodules::default(),
        };

        let path = compose_path(&[
            &frame.path_prefix,
            spec.path_prefix(),
            pd.path.as_deref().unwrap_or(name),
        ]);
        check_project_path(name, &path).map_err(|m| frame.malformed(m))?;

        let mut project = Project::new(name, url);
        project.description = pd.description.clone();
        project.revision = pd
            .revision
            .clone()
            .unwrap_or_else(|| defaults.revision.clone());
        project.path = path;
        project.submodules = submodules;
        project.clone_depth = pd.clone_depth;
        project.west_commands = pd
            .west_commands
            .clone()
            .map(|c| c.into_vec())
            .unwrap_or_default();
        project.remote_name = remote_name;
        project.groups = groups;
        project.userdata = pd.userdata.clone();
        project.topdir = self.topdir.clone();
        Ok((project, spec))
    }

    fn import_from_self(
        &mut self,
        frame: &Frame,
        spec: &ImportSpec,
        west_commands: &mut Vec<String>,
    ) -> Result<()> {
        if !spec.is_import() {
            return Ok(());
        }
        if self.mode == ImportMode::Ignore {
            log::debug!("ignoring self import {} in {}", spec.target(), frame.source);
            return Ok(());
        }
        let Some(repo) = frame.repo_abspath.clone() else {
            return Err(Error::ImportFailed {
                project: None,
                target: spec.target(),
            });
        };
        self.has_imports = true;

        match spec {
            ImportSpec::NoImport => Ok(()),
            ImportSpec::SinglePath(path) => {
                self.import_path_from_self(frame, &repo, path, west_commands)
            }
            ImportSpec::MultiPath(items) => {
                for item in items {
                    self.import_from_self(frame, item, west_commands)?;
                }
                Ok(())
            }
            ImportSpec::FilteredImport(imap) => {
                self.import_map_from_self(frame, &repo, imap, west_commands)
            }
        }
    }

    fn import_path_from_self(
        &mut self,
        frame: &Frame,
        repo: &Path,
        path: &str,
        west_commands: &mut Vec<String>,
    ) -> Result<()> {
        if is_absolute_like(path) {
            return Err(frame.malformed(format!("\"self: import: {}\" is an absolute path", path)));
        }
        let target = repo.join(normalize_path(path));
        if target.is_file() {
            self.import_self_file(frame, &target, west_commands)
        } else if target.is_dir() {
            for file in manifest_files_in(&target)? {
                self.import_self_file(frame, &file, west_commands)?;
            }
            Ok(())
        } else if target.exists() {
            Err(frame.malformed(format!(
                "\"self: import: {}\": this is neither a file nor a directory",
                path
            )))
        } else {
            Err(frame.malformed(format!("\"self: import: {}\": file not found", path)))
        }
    }

    fn import_map_from_self(
        &mut self,
        frame: &Frame,
        repo: &Path,
        imap: &ImportMap,
        west_commands: &mut Vec<String>,
    ) -> Result<()> {
        if is_absolute_like(&imap.file) {
            return Err(frame.malformed(format!(
                "\"self: import:\" file {} is an absolute path",
                imap.file
            )));
        }
        let child = Frame {
            filter: frame.filter.compose(imap),
            path_prefix: compose_prefix(&frame.path_prefix, imap),
            ..frame.clone()
        };
        let target = repo.join(normalize_path(&imap.file));
        let files = if target.is_dir() {
            manifest_files_in(&target)?
        } else if target.is_file() {
            vec![target]
        } else {
            return Err(frame.malformed(format!(
                "\"self: import:\" file {}: file not found",
                imap.file
            )));
        };
        for file in files {
            self.import_self_file(&child, &file, west_commands)?;
        }
        Ok(())
    }

    fn import_self_file(
        &mut self,
        frame: &Frame,
        file: &Path,
        west_commands: &mut Vec<String>,
    ) -> Result<()> {
        let file = canonical(file);
        let text = std::fs::read_to_string(&file).map_err(|e| {
            frame.malformed(format!("cannot read {}: {}", file.display(), e))
        })?;
        let child = Frame {
            source: ManifestSource::File(file.clone()),
            ..frame.clone()
        };

        self.enter(ImportKey {
            owner: frame.owner.clone(),
            target: file.display().to_string(),
        })?;
        let result = self.resolve_document(&child, &text, west_commands);
        self.leave();
        result.map(|_| ())
    }

    fn import_from_project(&mut self, frame: &Frame, name: &str, spec: &ImportSpec) -> Result<()> {
        if self.project_filter.evaluate(name) == FilterVerdict::Inactive {
            log::debug!(
                "project {} is inactive due to manifest.project-filter; ignoring its import",
                name
            );
            return Ok(());
        }
        let Some(project) = self.projects.get(name).cloned() else {
            return Ok(());
        };
        self.has_imports = true;
        self.dispatch_project_import(frame, &project, spec)
    }

    fn dispatch_project_import(
        &mut self,
        frame: &Frame,
        project: &Project,
        spec: &ImportSpec,
    ) -> Result<()> {
        match spec {
            ImportSpec::NoImport => Ok(()),
            ImportSpec::SinglePath(path) => self.import_path_from_project(frame, project, path, None),
            ImportSpec::MultiPath(items) => {
                for item in items {
                    self.dispatch_project_import(frame, project, item)?;
                }
                Ok(())
            }
            ImportSpec::FilteredImport(imap) => {
                self.import_path_from_project(frame, project, &imap.file, Some(imap))
            }
        }
    }

    fn import_path_from_project(
        &mut self,
        frame: &Frame,
        project: &Project,
        path: &str,
        imap: Option<&ImportMap>,
    ) -> Result<()> {
        log::debug!("resolving import {} for {}", path, project.name_and_path());
        let Some(contents) = self.content_from_project(project, path)? else {
            log::debug!("nothing to import from {} for {}", path, project.name);
            return Ok(());
        };

        let child = Frame {
            source: ManifestSource::Import {
                project: project.name.clone(),
                file: path.to_string(),
            },
            filter: match imap {
                Some(imap) => frame.filter.compose(imap),
                None => frame.filter.clone(),
            },
            path_prefix: match imap {
                Some(imap) => compose_prefix(&frame.path_prefix, imap),
                None => frame.path_prefix.clone(),
            },
            repo_abspath: project.abspath(),
            owner: Some(project.name.clone()),
        };

        for text in contents {
            // Commands declared by the imported data belong to the project.
            let mut imported_commands = Vec::new();
            self.enter(ImportKey {
                owner: Some(project.name.clone()),
                target: path.to_string(),
            })?;
            let result = self.resolve_document(&child, &text, &mut imported_commands);
            self.leave();
            result?;

            if let Some(target) = self.projects.get_mut(&project.name) {
                target.west_commands =
                    merge_west_commands(&target.west_commands, &imported_commands);
            }
        }
        log::debug!("done resolving import {} for {}", path, project.name);
        Ok(())
    }

    fn content_from_project(&mut self, project: &Project, path: &str) -> Result<Option<Vec<String>>> {
        if self.mode != ImportMode::ForceProjects && self.provider.is_cloned(project) {
            match self
                .provider
                .content_at(project, path, QUAL_MANIFEST_REV_BRANCH)
            {
                Ok(Some(contents)) => return Ok(Some(contents)),
                Ok(None) => log::debug!(
                    "{} not found in {} at {}; asking the importer",
                    path,
                    project.name,
                    QUAL_MANIFEST_REV_BRANCH
                ),
                Err(Error::GitCommand { stderr, .. }) => log::debug!(
                    "cannot read {} from {}: {}; asking the importer",
                    path,
                    project.name,
                    stderr
                ),
                Err(e) => return Err(e),
            }
        }
        self.importer.import(project, path)
    }
}

fn load_defaults(
    frame: &Frame,
    defaults: DefaultsData,
    url_bases: &HashMap<String, String>,
) -> Result<Defaults> {
    if let Some(remote) = &defaults.remote {
        if !url_bases.contains_key(remote) {
            return Err(frame.malformed(format!(
                "default remote {} is not defined in \"remotes:\"",
                remote
            )));
        }
    }
    Ok(Defaults {
        remote: defaults.remote,
        revision: defaults
            .revision
            .unwrap_or_else(|| DEFAULT_REVISION.to_string()),
    })
}

/// Checks that no two projects share a normalized path.
///
/// `manifest_path` is the manifest repository's own path, which counts
/// as taken.
pub fn check_paths_are_unique(
    projects: &[Project],
    manifest_path: Option<&str>,
    location: &str,
) -> Result<()> {
    let mut taken: HashMap<String, &str> = HashMap::new();
    if let Some(path) = manifest_path.filter(|p| !p.is_empty()) {
        taken.insert(normalize_path(path), "manifest");
    }
    for project in projects {
        let normalized = normalize_path(&project.path);
        if let Some(other) = taken.get(&normalized) {
            return Err(Error::malformed(
                location,
                format!(
                    "project {} path \"{}\" is taken by project {}",
                    project.name, project.path, other
                ),
            ));
        }
        taken.insert(normalized, &project.name);
    }
    Ok(())
}
