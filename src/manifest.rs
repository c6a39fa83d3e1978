//! # Resolved Manifests
//!
//! [`Manifest`] is the read-only result of resolving a workspace manifest:
//! the flattened project list, the final group filter and the queries
//! callers run against them.
//!
//! ## Construction
//!
//! - [`Manifest::from_topdir`] reads the manifest of an existing workspace,
//!   located through the `manifest.path` and `manifest.file` options of its
//!   local configuration file.
//! - [`Manifest::from_file`] reads any manifest file, inside a workspace or
//!   not.
//! - [`Manifest::from_data`] resolves in-memory text.
//!
//! [`ManifestBuilder`] provides the same constructors with control over
//! the import mode, the content provider, the importer callback and the
//! configuration.
//!
//! ## Example
//!
//! ```
//! use west_manifest::Manifest;
//!
//! let manifest = Manifest::from_data(
//!     r#"
//! manifest:
//!   remotes:
//!     - name: upstream
//!       url-base: https://example.com
//!   projects:
//!     - name: hal
//!       remote: upstream
//!       groups: [optional]
//!   group-filter: [-optional]
//! "#,
//! )
//! .unwrap();
//!
//! let hal = &manifest.projects()[1];
//! assert_eq!(hal.url, "https://example.com/hal");
//! assert!(!manifest.is_active(hal));
//! assert_eq!(manifest.group_filter(), ["-optional"]);
//! ```

use serde_yaml::{Mapping, Value};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::config::{Configuration, ManifestConfig};
use crate::defaults::{LEGACY_GROUP_FILTER_VERSION, MANIFEST_PROJECT_INDEX, QUAL_MANIFEST_REV_BRANCH};
use crate::document::ManifestSource;
use crate::error::{Error, Result};
use crate::group_filter::{
    display_filter, update_disabled_groups, FilterVerdict, GroupFilter, GroupFilterDirective,
    ProjectFilter,
};
use crate::project::Project;
use crate::repository::{ContentProvider, FailingImporter, GitProvider, Importer};
use crate::resolver::{check_paths_are_unique, ImportMode, Resolution, Resolver};
use crate::validate::normalize_path;

/// Options for resolving a manifest.
pub struct ManifestBuilder {
    importer: Box<dyn Importer>,
    provider: Box<dyn ContentProvider>,
    mode: ImportMode,
    config: Option<Configuration>,
    topdir: Option<PathBuf>,
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        ManifestBuilder {
            importer: Box::new(FailingImporter),
            provider: Box::new(GitProvider),
            mode: ImportMode::Default,
            config: None,
            topdir: None,
        }
    }
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fallback for import content the provider cannot supply.
    pub fn importer(mut self, importer: impl Importer + 'static) -> Self {
        self.importer = Box::new(importer);
        self
    }

    /// Source of project content; [`GitProvider`] by default.
    pub fn provider(mut self, provider: impl ContentProvider + 'static) -> Self {
        self.provider = Box::new(provider);
        self
    }

    pub fn import_mode(mut self, mode: ImportMode) -> Self {
        self.mode = mode;
        self
    }

    /// Uses `config` instead of reading configuration files.
    pub fn config(mut self, config: Configuration) -> Self {
        self.config = Some(config);
        self
    }

    /// Workspace top directory for `load_file` and `load_data`.
    pub fn topdir(mut self, topdir: impl Into<PathBuf>) -> Self {
        self.topdir = Some(topdir.into());
        self
    }

    /// Resolves the manifest of the workspace at `topdir`.
    pub fn load_topdir(mut self, topdir: impl AsRef<Path>) -> Result<Manifest> {
        let topdir = topdir.as_ref().to_path_buf();
        let config = match self.config.take() {
            Some(config) => config,
            None => Configuration::load(Some(&topdir))?,
        };
        let manifest_config = ManifestConfig::from_config(&config)?;
        let Some(manifest_path) = manifest_config.path.clone() else {
            return Err(Error::MalformedConfig {
                message: format!(
                    "no local \"manifest.path\" config option is set in {}",
                    topdir.display()
                ),
            });
        };

        let repo_abspath = topdir.join(normalize_path(&manifest_path));
        let file = repo_abspath.join(&manifest_config.file);
        if !file.is_file() {
            return Err(Error::MalformedConfig {
                message: format!("manifest file not found: {}", file.display()),
            });
        }
        let text = std::fs::read_to_string(&file)?;
        self.topdir = Some(topdir);
        self.resolve(
            &text,
            ManifestSource::File(file),
            Some(repo_abspath),
            Some(manifest_path),
            manifest_config,
        )
    }

    /// Resolves the manifest in `path`.
    ///
    /// `self: import:` paths are relative to the directory holding the file.
    pub fn load_file(mut self, path: impl AsRef<Path>) -> Result<Manifest> {
        let file = path.as_ref().to_path_buf();
        let text = std::fs::read_to_string(&file)?;
        let repo_abspath = file
            .parent()
            .map(|dir| std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()));

        let manifest_path = match (&self.topdir, &repo_abspath) {
            (Some(topdir), Some(repo)) => {
                let topdir = std::fs::canonicalize(topdir).unwrap_or_else(|_| topdir.clone());
                repo.strip_prefix(&topdir)
                    .ok()
                    .map(|rel| rel.to_string_lossy().replace('\\', "/"))
                    .filter(|rel| !rel.is_empty())
            }
            _ => None,
        };
        let manifest_config = self.manifest_config()?;
        self.resolve(
            &text,
            ManifestSource::File(file),
            repo_abspath,
            manifest_path,
            manifest_config,
        )
    }

    /// Resolves manifest text held in memory.
    ///
    /// There is no manifest repository on disk, so `self: import:` fails
    /// unless imports are ignored.
    pub fn load_data(mut self, text: &str) -> Result<Manifest> {
        let manifest_config = self.manifest_config()?;
        self.resolve(text, ManifestSource::Data, None, None, manifest_config)
    }

    fn manifest_config(&mut self) -> Result<ManifestConfig> {
        match (self.config.take(), &self.topdir) {
            (Some(config), _) => ManifestConfig::from_config(&config),
            (None, Some(topdir)) => ManifestConfig::from_config(&Configuration::load(Some(topdir))?),
            (None, None) => Ok(ManifestConfig::default()),
        }
    }

    fn resolve(
        mut self,
        text: &str,
        source: ManifestSource,
        repo_abspath: Option<PathBuf>,
        config_manifest_path: Option<String>,
        config: ManifestConfig,
    ) -> Result<Manifest> {
        let location = source.to_string();
        let resolution = Resolver::new(
            &*self.provider,
            &mut *self.importer,
            &config.project_filter,
            self.mode,
            self.topdir.clone(),
        )
        .resolve(text, source, repo_abspath)?;

        // Inside a workspace the configuration is authoritative about where
        // the manifest repository lives.
        let manifest_path = match &self.topdir {
            Some(_) => config_manifest_path.or_else(|| resolution.self_path.clone()),
            None => resolution.self_path.clone(),
        };
        check_paths_are_unique(&resolution.projects, manifest_path.as_deref(), &location)?;

        Ok(Manifest::new(
            resolution,
            manifest_path,
            self.topdir,
            location,
            config,
            self.provider,
        ))
    }
}

/// A fully resolved manifest.
pub struct Manifest {
    projects: Vec<Project>,
    by_name: HashMap<String, usize>,
    by_abspath: HashMap<PathBuf, usize>,
    /// Disabled groups from the manifest data alone
    disabled_groups: BTreeSet<String>,
    config_group_filter: GroupFilter,
    project_filter: ProjectFilter,
    group_filter: Vec<String>,
    has_imports: bool,
    schema_version: String,
    topdir: Option<PathBuf>,
    location: String,
    provider: Box<dyn ContentProvider>,
}

impl std::fmt::Debug for Manifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manifest")
            .field("location", &self.location)
            .field("projects", &self.projects)
            .field("group_filter", &self.group_filter)
            .finish_non_exhaustive()
    }
}

/// Absolute, normalized form of `path` used to compare project locations.
fn comparable_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut clean = PathBuf::new();
    for component in absolute.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                clean.pop();
            }
            other => clean.push(other),
        }
    }
    clean
}

impl Manifest {
    /// Resolves the manifest of the workspace at `topdir`.
    pub fn from_topdir(topdir: impl AsRef<Path>) -> Result<Self> {
        ManifestBuilder::new().load_topdir(topdir)
    }

    /// Resolves the manifest in `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        ManifestBuilder::new().load_file(path)
    }

    /// Resolves manifest text held in memory.
    pub fn from_data(text: &str) -> Result<Self> {
        ManifestBuilder::new().load_data(text)
    }

    fn new(
        resolution: Resolution,
        manifest_path: Option<String>,
        topdir: Option<PathBuf>,
        location: String,
        config: ManifestConfig,
        provider: Box<dyn ContentProvider>,
    ) -> Self {
        let (disabled_groups, group_filter) = final_group_filter(&resolution);

        let mut projects = Vec::with_capacity(resolution.projects.len() + 1);
        projects.push(Project::manifest(
            manifest_path,
            resolution.manifest_west_commands,
            topdir.clone(),
            resolution.userdata,
        ));
        projects.extend(resolution.projects);

        let mut by_name = HashMap::new();
        let mut by_abspath = HashMap::new();
        for (i, project) in projects.iter().enumerate() {
            by_name.insert(project.name.clone(), i);
            if let Some(abspath) = project.abspath() {
                by_abspath.insert(comparable_path(&abspath), i);
            }
        }

        Manifest {
            projects,
            by_name,
            by_abspath,
            disabled_groups,
            config_group_filter: config.group_filter,
            project_filter: config.project_filter,
            group_filter,
            has_imports: resolution.has_imports,
            schema_version: resolution.schema_version,
            topdir,
            location,
            provider,
        }
    }

    /// Every project, with the manifest repository at index 0.
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// The manifest repository's own record.
    pub fn manifest_project(&self) -> &Project {
        &self.projects[MANIFEST_PROJECT_INDEX]
    }

    /// Looks up one project by name.
    pub fn project(&self, name: &str) -> Option<&Project> {
        self.by_name.get(name).map(|&i| &self.projects[i])
    }

    /// The final group filter: one `-group` item per disabled group.
    pub fn group_filter(&self) -> &[String] {
        &self.group_filter
    }

    /// True if resolution met at least one import that was not ignored.
    pub fn has_imports(&self) -> bool {
        self.has_imports
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn userdata(&self) -> Option<&Value> {
        self.manifest_project().userdata.as_ref()
    }

    /// Path of the manifest repository relative to the top directory.
    pub fn path(&self) -> Option<&str> {
        let path = &self.manifest_project().path;
        (!path.is_empty()).then_some(path.as_str())
    }

    pub fn topdir(&self) -> Option<&Path> {
        self.topdir.as_deref()
    }

    /// Resolves project names or paths to projects.
    ///
    /// Names are tried first, then, with `allow_paths`, paths on disk.
    /// Every id that names no project and, with `only_cloned`, every
    /// matched project that is not cloned is collected into one
    /// [`Error::ProjectLookup`]. With no ids, every project is returned.
    pub fn get_projects<S: AsRef<str>>(
        &self,
        ids: &[S],
        allow_paths: bool,
        only_cloned: bool,
    ) -> Result<Vec<&Project>> {
        let mut unknown = Vec::new();
        let mut uncloned = Vec::new();

        let found: Vec<&Project> = if ids.is_empty() {
            self.projects.iter().collect()
        } else {
            ids.iter()
                .filter_map(|id| {
                    let id = id.as_ref();
                    let index = self.by_name.get(id).copied().or_else(|| {
                        allow_paths
                            .then(|| self.by_abspath.get(&comparable_path(Path::new(id))))
                            .flatten()
                            .copied()
                    });
                    if index.is_none() {
                        unknown.push(id.to_string());
                    }
                    index.map(|i| &self.projects[i])
                })
                .collect()
        };

        if only_cloned {
            uncloned = found
                .iter()
                .filter(|p| !self.provider.is_cloned(p))
                .map(|p| p.name.clone())
                .collect();
        }
        if !unknown.is_empty() || !uncloned.is_empty() {
            return Err(Error::ProjectLookup { unknown, uncloned });
        }
        Ok(found)
    }

    /// Checks whether a project is active under the configured filters.
    pub fn is_active(&self, project: &Project) -> bool {
        self.active_under(project, &[])
    }

    /// Like [`Manifest::is_active`], with one more group filter applied
    /// last, such as one given on a command line.
    pub fn is_active_with<S: AsRef<str>>(&self, project: &Project, extra: &[S]) -> Result<bool> {
        let extra = extra
            .iter()
            .map(|token| {
                GroupFilterDirective::parse(token.as_ref())
                    .map_err(|complaint| Error::malformed(self.location.clone(), complaint))
            })
            .collect::<Result<GroupFilter>>()?;
        Ok(self.active_under(project, &extra))
    }

    fn active_under(&self, project: &Project, extra: &[GroupFilterDirective]) -> bool {
        if !project.is_manifest() {
            match self.project_filter.evaluate(&project.name) {
                FilterVerdict::Active => return true,
                FilterVerdict::Inactive => return false,
                FilterVerdict::NoMatch => {}
            }
        }
        if project.groups.is_empty() {
            return true;
        }

        let mut disabled = self.disabled_groups.clone();
        update_disabled_groups(&mut disabled, &self.config_group_filter);
        update_disabled_groups(&mut disabled, extra);
        project.groups.iter().any(|group| !disabled.contains(group))
    }

    fn document(&self, projects: Vec<Value>) -> Value {
        let mut manifest = Mapping::new();
        if !self.group_filter.is_empty() {
            manifest.insert(
                "group-filter".into(),
                Value::Sequence(self.group_filter.iter().cloned().map(Value::from).collect()),
            );
        }
        manifest.insert("projects".into(), Value::Sequence(projects));
        manifest.insert("self".into(), self.manifest_project().to_value(None));

        let mut top = Mapping::new();
        top.insert("manifest".into(), Value::Mapping(manifest));
        Value::Mapping(top)
    }

    fn regular_projects(&self) -> &[Project] {
        &self.projects[MANIFEST_PROJECT_INDEX + 1..]
    }

    /// The resolved manifest as a document, with no imports left.
    pub fn as_value(&self) -> Value {
        self.document(
            self.regular_projects()
                .iter()
                .map(|p| p.to_value(None))
                .collect(),
        )
    }

    /// The resolved manifest as a document, with every revision replaced
    /// by the commit its `manifest-rev` branch points to.
    pub fn as_frozen_value(&self) -> Result<Value> {
        let projects = self
            .regular_projects()
            .iter()
            .map(|p| self.frozen_project(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.document(projects))
    }

    fn frozen_project(&self, project: &Project) -> Result<Value> {
        if !self.provider.is_cloned(project) {
            return Err(Error::Freeze {
                project: project.name.clone(),
                message: "project is not cloned".to_string(),
            });
        }
        let sha = self
            .provider
            .sha(project, QUAL_MANIFEST_REV_BRANCH)
            .map_err(|e| Error::Freeze {
                project: project.name.clone(),
                message: format!(
                    "{} cannot be resolved to a commit: {}",
                    QUAL_MANIFEST_REV_BRANCH, e
                ),
            })?;
        Ok(project.to_value(Some(&sha)))
    }

    pub fn as_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.as_value())?)
    }

    pub fn as_frozen_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.as_frozen_value()?)?)
    }
}

/// Computes the disabled groups and the final group filter.
fn final_group_filter(resolution: &Resolution) -> (BTreeSet<String>, Vec<String>) {
    if resolution.schema_version == LEGACY_GROUP_FILTER_VERSION {
        if !resolution.directives.is_empty() {
            log::warn!(
                "providing deprecated group-filter semantics due to explicit \
                 'manifest: version: 0.9'; for the new semantics, use \
                 'manifest: version: \"0.10\"' or later"
            );
        }
        let top_level = resolution.top_level_group_filter.clone().unwrap_or_default();
        let mut disabled = BTreeSet::new();
        update_disabled_groups(&mut disabled, &top_level);
        let filter = top_level.iter().map(ToString::to_string).collect();
        return (disabled, filter);
    }

    let disabled = resolution.directives.disabled_groups();
    let filter: GroupFilter = disabled
        .iter()
        .map(|group| GroupFilterDirective {
            group: group.clone(),
            enable: false,
        })
        .collect();
    log::debug!("final top level group-filter: {}", display_filter(&filter));
    let rendered = filter.iter().map(ToString::to_string).collect();
    (disabled, rendered)
}
