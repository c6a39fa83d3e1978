//! # Projects
//!
//! A [`Project`] is one repository of the workspace, as it stands after
//! resolution: its URL is fully expanded from remotes, its path carries
//! every import path prefix on the route to it, and its groups are
//! validated. The manifest repository itself is also represented as a
//! `Project`, built with [`Project::manifest`], so that the resolved list
//! can be handled uniformly.

use serde_yaml::{Mapping, Value};
use std::path::PathBuf;

use crate::defaults::{
    DEFAULT_REMOTE_NAME, MANIFEST_PROJECT_NAME, MANIFEST_PROJECT_REVISION,
};
use crate::validate::normalize_path;

/// One entry of a `submodules:` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submodule {
    /// Path of the submodule, relative to the project
    pub path: String,
    pub name: Option<String>,
}

/// The `submodules:` value of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submodules {
    /// `true` means every submodule, `false` means none
    All(bool),
    /// Only the listed submodules
    List(Vec<Submodule>),
}

impl Default for Submodules {
    fn default() -> Self {
        Submodules::All(false)
    }
}

impl Submodules {
    /// Interprets a raw `submodules:` value.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(Submodules::All(*b)),
            Value::Sequence(items) => items
                .iter()
                .map(submodule_from_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Submodules::List),
            other => Err(format!(
                "submodules must be a boolean or a list, not {:?}",
                other
            )),
        }
    }

    fn is_set(&self) -> bool {
        !matches!(self, Submodules::All(false))
    }

    fn to_value(&self) -> Value {
        match self {
            Submodules::All(b) => Value::Bool(*b),
            Submodules::List(list) => Value::Sequence(
                list.iter()
                    .map(|s| {
                        let mut map = Mapping::new();
                        if let Some(name) = &s.name {
                            map.insert("name".into(), name.clone().into());
                        }
                        map.insert("path".into(), s.path.clone().into());
                        Value::Mapping(map)
                    })
                    .collect(),
            ),
        }
    }
}

fn submodule_from_value(value: &Value) -> Result<Submodule, String> {
    let map = value
        .as_mapping()
        .ok_or_else(|| format!("submodule {:?} must be a mapping", value))?;
    let mut path = None;
    let mut name = None;
    for (key, val) in map {
        match (key.as_str(), val) {
            (Some("path"), Value::String(s)) => path = Some(s.clone()),
            (Some("name"), Value::String(s)) => name = Some(s.clone()),
            (Some(k @ ("path" | "name")), _) => {
                return Err(format!("submodule {} must be a string", k))
            }
            _ => return Err(format!("submodule has unknown key {:?}", key)),
        }
    }
    let path = path.ok_or_else(|| "submodule is missing its path".to_string())?;
    Ok(Submodule { path, name })
}

/// Merges two `west-commands` lists, keeping order and dropping repeats.
pub fn merge_west_commands(first: &[String], second: &[String]) -> Vec<String> {
    let mut merged = first.to_vec();
    for cmd in second {
        if !merged.contains(cmd) {
            merged.push(cmd.clone());
        }
    }
    merged
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Regular,
    ManifestRepository,
}

/// A resolved workspace project.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub name: String,
    pub description: Option<String>,
    /// Fetch URL; empty for the manifest repository
    pub url: String,
    pub revision: String,
    /// Workspace-relative path in `/`-separated form
    pub path: String,
    pub submodules: Submodules,
    pub clone_depth: Option<u32>,
    pub west_commands: Vec<String>,
    /// Name of the remote the URL came from
    pub remote_name: String,
    pub groups: Vec<String>,
    pub userdata: Option<Value>,
    /// Workspace top directory, if there is one
    pub topdir: Option<PathBuf>,
    kind: Kind,
}

impl Project {
    /// Creates a project with the given name and URL and default settings.
    ///
    /// The path defaults to the name and the revision to `master`.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let name = name.into();
        Project {
            path: name.clone(),
            name,
            description: None,
            url: url.into(),
            revision: crate::defaults::DEFAULT_REVISION.to_string(),
            submodules: Submodules::default(),
            clone_depth: None,
            west_commands: Vec::new(),
            remote_name: DEFAULT_REMOTE_NAME.to_string(),
            groups: Vec::new(),
            userdata: None,
            topdir: None,
            kind: Kind::Regular,
        }
    }

    /// Creates the record for the manifest repository.
    ///
    /// `path` is empty when the repository's location is unknown, which
    /// happens for manifests built from in-memory data.
    pub fn manifest(
        path: Option<String>,
        west_commands: Vec<String>,
        topdir: Option<PathBuf>,
        userdata: Option<Value>,
    ) -> Self {
        Project {
            name: MANIFEST_PROJECT_NAME.to_string(),
            description: None,
            url: String::new(),
            revision: MANIFEST_PROJECT_REVISION.to_string(),
            path: path.unwrap_or_default(),
            submodules: Submodules::default(),
            clone_depth: None,
            west_commands,
            remote_name: String::new(),
            groups: Vec::new(),
            userdata,
            topdir,
            kind: Kind::ManifestRepository,
        }
    }

    /// True for the manifest repository's own record.
    pub fn is_manifest(&self) -> bool {
        self.kind == Kind::ManifestRepository
    }

    /// Absolute location on disk, if the workspace top directory is known.
    pub fn abspath(&self) -> Option<PathBuf> {
        match (&self.topdir, self.path.is_empty()) {
            (Some(topdir), false) => Some(topdir.join(normalize_path(&self.path))),
            _ => None,
        }
    }

    /// Short description used in messages, such as `hal (modules/hal)`.
    pub fn name_and_path(&self) -> String {
        if self.path.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.path)
        }
    }

    /// Serializes the project the way a hand-written manifest would list it.
    ///
    /// `revision` replaces the declared revision, which is how frozen
    /// manifests pin exact commits. Fields that are unset are left out, and
    /// `path` is left out when it equals the name.
    pub fn to_value(&self, revision: Option<&str>) -> Value {
        let mut map = Mapping::new();
        if self.is_manifest() {
            if !self.path.is_empty() {
                map.insert("path".into(), self.path.clone().into());
            }
        } else {
            map.insert("name".into(), self.name.clone().into());
            if let Some(description) = &self.description {
                map.insert("description".into(), description.clone().into());
            }
            map.insert("url".into(), self.url.clone().into());
            map.insert(
                "revision".into(),
                revision.unwrap_or(&self.revision).to_string().into(),
            );
            if self.path != self.name {
                map.insert("path".into(), self.path.clone().into());
            }
            if let Some(depth) = self.clone_depth {
                map.insert("clone-depth".into(), Value::Number(depth.into()));
            }
        }
        match self.west_commands.as_slice() {
            [] => {}
            [one] => {
                map.insert("west-commands".into(), one.clone().into());
            }
            many => {
                map.insert(
                    "west-commands".into(),
                    Value::Sequence(many.iter().cloned().map(Value::from).collect()),
                );
            }
        }
        if !self.groups.is_empty() {
            map.insert(
                "groups".into(),
                Value::Sequence(self.groups.iter().cloned().map(Value::from).collect()),
            );
        }
        if self.submodules.is_set() {
            map.insert("submodules".into(), self.submodules.to_value());
        }
        if let Some(userdata) = &self.userdata {
            map.insert("userdata".into(), userdata.clone());
        }
        Value::Mapping(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_submodules_bool() {
        assert_eq!(Submodules::from_value(&yaml("true")).unwrap(), Submodules::All(true));
        assert_eq!(Submodules::from_value(&yaml("false")).unwrap(), Submodules::All(false));
    }

    #[test]
    fn test_submodules_list() {
        let value = yaml("[{path: lib/a}, {path: lib/b, name: bee}]");
        assert_eq!(
            Submodules::from_value(&value).unwrap(),
            Submodules::List(vec![
                Submodule {
                    path: "lib/a".into(),
                    name: None
                },
                Submodule {
                    path: "lib/b".into(),
                    name: Some("bee".into())
                },
            ])
        );
    }

    #[test]
    fn test_submodules_rejects_bad_shapes() {
        assert!(Submodules::from_value(&yaml("yes please")).is_err());
        assert!(Submodules::from_value(&yaml("[lib/a]")).is_err());
        assert!(Submodules::from_value(&yaml("[{name: x}]")).is_err());
        assert!(Submodules::from_value(&yaml("[{path: a, url: b}]")).is_err());
        assert!(Submodules::from_value(&yaml("[{path: 3}]")).is_err());
    }

    #[test]
    fn test_merge_west_commands() {
        let a = vec!["x.yml".to_string(), "y.yml".to_string()];
        let b = vec!["y.yml".to_string(), "z.yml".to_string()];
        assert_eq!(merge_west_commands(&a, &b), vec!["x.yml", "y.yml", "z.yml"]);
        assert_eq!(merge_west_commands(&[], &b), b);
    }

    #[test]
    fn test_abspath_needs_topdir() {
        let mut project = Project::new("hal", "https://example.com/hal");
        assert!(project.abspath().is_none());
        project.topdir = Some(PathBuf::from("/ws"));
        project.path = "modules/./hal".into();
        assert_eq!(project.abspath().unwrap(), PathBuf::from("/ws/modules/hal"));
    }

    #[test]
    fn test_manifest_project_defaults() {
        let mp = Project::manifest(None, vec![], None, None);
        assert!(mp.is_manifest());
        assert_eq!(mp.name, "manifest");
        assert_eq!(mp.revision, "HEAD");
        assert!(mp.url.is_empty());
        assert!(mp.abspath().is_none());
        assert_eq!(mp.name_and_path(), "manifest");
    }

    #[test]
    fn test_to_value_omits_defaults() {
        let project = Project::new("hal", "https://example.com/hal");
        let value = project.to_value(None);
        let map = value.as_mapping().unwrap();
        assert_eq!(map.get("name").unwrap(), "hal");
        assert_eq!(map.get("revision").unwrap(), "master");
        assert!(map.get("path").is_none());
        assert!(map.get("groups").is_none());
        assert!(map.get("submodules").is_none());
        assert!(map.get("west-commands").is_none());
    }

    #[test]
    fn test_to_value_full_and_frozen() {
        let mut project = Project::new("hal", "https://example.com/hal");
        project.path = "modules/hal".into();
        project.groups = vec!["a".into()];
        project.clone_depth = Some(1);
        project.west_commands = vec!["one.yml".into()];
        project.submodules = Submodules::All(true);
        project.description = Some("HAL".into());

        let value = project.to_value(Some("0123abcd"));
        let map = value.as_mapping().unwrap();
        assert_eq!(map.get("revision").unwrap(), "0123abcd");
        assert_eq!(map.get("path").unwrap(), "modules/hal");
        assert_eq!(map.get("west-commands").unwrap(), "one.yml");
        assert_eq!(map.get("clone-depth").unwrap(), &Value::Number(1.into()));
        assert_eq!(map.get("submodules").unwrap(), &Value::Bool(true));
        assert_eq!(map.get("description").unwrap(), "HAL");
    }
}
