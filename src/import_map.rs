//! # Import Values and Import Maps
//!
//! An `import:` value takes one of four shapes, modelled by [`ImportSpec`]:
//!
//! - `false` (or absent): no import
//! - a path string, or `true` for the default `west.yml`
//! - a list of import values
//! - a mapping, the [`ImportMap`], which names a file and filters what the
//!   imported content may contribute
//!
//! While an import map is being resolved, every project that surfaces from
//! the imported content must pass its allow/block lists. Nested import maps
//! compose into an [`ImportFilter`]: a project must pass every map on the
//! route from the root document to the point where it was declared.
//!
//! Path patterns match like a relative glob: a pattern with `n` components
//! is matched against the last `n` components of the project's path, one
//! component at a time.

use glob::Pattern;
use serde_yaml::Value;
use std::rc::Rc;

use crate::defaults::MANIFEST_FILE;
use crate::validate::compose_path;

/// A compiled path allowlist or blocklist entry.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    absolute: bool,
    parts: Vec<Pattern>,
}

impl PathPattern {
    pub fn new(raw: &str) -> Result<Self, String> {
        let absolute = raw.starts_with('/');
        let parts = raw
            .split('/')
            .filter(|p| !p.is_empty() && *p != ".")
            .map(|p| Pattern::new(p).map_err(|e| format!("invalid path pattern {}: {}", raw, e)))
            .collect::<Result<Vec<_>, _>>()?;
        if parts.is_empty() {
            return Err(format!("empty path pattern {:?}", raw));
        }
        Ok(PathPattern {
            raw: raw.to_string(),
            absolute,
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Matches `path` from the right, one component at a time.
    pub fn matches(&self, path: &str) -> bool {
        let components: Vec<&str> = path
            .split('/')
            .filter(|p| !p.is_empty() && *p != ".")
            .collect();
        if self.absolute {
            if !path.starts_with('/') || components.len() != self.parts.len() {
                return false;
            }
        } else if components.len() < self.parts.len() {
            return false;
        }
        components
            .iter()
            .rev()
            .zip(self.parts.iter().rev())
            .all(|(component, pattern)| pattern.matches(component))
    }
}

/// The mapping form of an `import:` value.
#[derive(Debug, Clone, Default)]
pub struct ImportMap {
    /// File or directory to import
    pub file: String,
    pub name_allowlist: Vec<String>,
    pub path_allowlist: Vec<PathPattern>,
    pub name_blocklist: Vec<String>,
    pub path_blocklist: Vec<PathPattern>,
    /// Prefix for the paths of every project this import produces
    pub path_prefix: String,
}

fn string_list(key: &str, value: &Value) -> Result<Vec<String>, String> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Sequence(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("{} entries must be strings, not {:?}", key, item))
            })
            .collect(),
        other => Err(format!(
            "{} must be a string or a list of strings, not {:?}",
            key, other
        )),
    }
}

fn pattern_list(key: &str, value: &Value) -> Result<Vec<PathPattern>, String> {
    string_list(key, value)?
        .iter()
        .map(String::as_str)
        .map(PathPattern::new)
        .collect()
}

impl ImportMap {
    /// Interprets the mapping form of an `import:` value.
    ///
    /// The deprecated `*-whitelist` and `*-blacklist` spellings are accepted
    /// as aliases of the allowlist and blocklist keys.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let map = value
            .as_mapping()
            .ok_or_else(|| format!("import map must be a mapping, not {:?}", value))?;

        let mut imap = ImportMap {
            file: MANIFEST_FILE.to_string(),
            ..Default::default()
        };
        for (key, val) in map {
            let key = key
                .as_str()
                .ok_or_else(|| format!("invalid import key {:?}", key))?;
            match key {
                "file" => {
                    imap.file = val
                        .as_str()
                        .ok_or_else(|| format!("import file must be a string, not {:?}", val))?
                        .to_string()
                }
                "path-prefix" => {
                    imap.path_prefix = val
                        .as_str()
                        .ok_or_else(|| {
                            format!("import path-prefix must be a string, not {:?}", val)
                        })?
                        .to_string()
                }
                "name-allowlist" | "name-whitelist" => {
                    imap.name_allowlist.extend(string_list(key, val)?)
                }
                "name-blocklist" | "name-blacklist" => {
                    imap.name_blocklist.extend(string_list(key, val)?)
                }
                "path-allowlist" | "path-whitelist" => {
                    imap.path_allowlist.extend(pattern_list(key, val)?)
                }
                "path-blocklist" | "path-blacklist" => {
                    imap.path_blocklist.extend(pattern_list(key, val)?)
                }
                other => return Err(format!("invalid import contents: unknown key {}", other)),
            }
        }
        Ok(imap)
    }

    /// True if the map restricts anything beyond choosing a file.
    pub fn has_filters(&self) -> bool {
        !(self.name_allowlist.is_empty()
            && self.path_allowlist.is_empty()
            && self.name_blocklist.is_empty()
            && self.path_blocklist.is_empty())
    }

    /// Decides whether a project with this name and path is admitted.
    pub fn admits(&self, name: &str, path: &str) -> bool {
        let blocked = self.name_blocklist.iter().any(|n| n == name)
            || self.path_blocklist.iter().any(|p| p.matches(path));
        let allowed = self.name_allowlist.iter().any(|n| n == name)
            || self.path_allowlist.iter().any(|p| p.matches(path));
        let no_allowlists = self.name_allowlist.is_empty() && self.path_allowlist.is_empty();

        if blocked {
            allowed
        } else {
            allowed || no_allowlists
        }
    }
}

/// An interpreted `import:` value.
#[derive(Debug, Clone)]
pub enum ImportSpec {
    NoImport,
    SinglePath(String),
    /// Elements are themselves paths or import maps
    MultiPath(Vec<ImportSpec>),
    FilteredImport(ImportMap),
}

impl ImportSpec {
    /// Interprets a project's `import:` value; `true` means `west.yml`.
    ///
    /// Empty strings and empty lists import nothing.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null | Value::Bool(false) => Ok(ImportSpec::NoImport),
            Value::String(path) if path.is_empty() => Ok(ImportSpec::NoImport),
            Value::Sequence(items) if items.is_empty() => Ok(ImportSpec::NoImport),
            Value::Bool(true) => Ok(ImportSpec::SinglePath(MANIFEST_FILE.to_string())),
            Value::String(path) => Ok(ImportSpec::SinglePath(path.clone())),
            Value::Sequence(items) => items
                .iter()
                .map(ImportSpec::from_value)
                .collect::<Result<Vec<_>, _>>()
                .map(ImportSpec::MultiPath),
            Value::Mapping(_) => ImportMap::from_value(value).map(ImportSpec::FilteredImport),
            other => Err(format!("invalid import {:?}", other)),
        }
    }

    /// Interprets a `self: import:` value, where booleans are not allowed.
    pub fn from_self_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Err(format!(
                "\"self: import: {}\" is not allowed; use a file name, a list or a mapping",
                b
            )),
            Value::Sequence(items) if !items.is_empty() => items
                .iter()
                .map(ImportSpec::from_self_value)
                .collect::<Result<Vec<_>, _>>()
                .map(ImportSpec::MultiPath),
            other => ImportSpec::from_value(other),
        }
    }

    /// Human-readable description of what this value imports.
    pub fn target(&self) -> String {
        match self {
            ImportSpec::NoImport => String::new(),
            ImportSpec::SinglePath(path) => path.clone(),
            ImportSpec::MultiPath(items) => items
                .iter()
                .map(ImportSpec::target)
                .collect::<Vec<_>>()
                .join(", "),
            ImportSpec::FilteredImport(imap) => imap.file.clone(),
        }
    }

    pub fn is_import(&self) -> bool {
        !matches!(self, ImportSpec::NoImport)
    }

    /// The path prefix a project's own import map adds to its path.
    pub fn path_prefix(&self) -> &str {
        match self {
            ImportSpec::FilteredImport(imap) => &imap.path_prefix,
            _ => "",
        }
    }
}

/// The conjunction of every import map on the route to the current document.
#[derive(Debug, Clone, Default)]
pub struct ImportFilter {
    maps: Vec<Rc<ImportMap>>,
}

impl ImportFilter {
    /// Returns a filter that also requires `imap` to admit a project.
    ///
    /// Maps without allow or block lists do not restrict anything and are
    /// not recorded.
    pub fn compose(&self, imap: &ImportMap) -> ImportFilter {
        let mut maps = self.maps.clone();
        if imap.has_filters() {
            maps.push(Rc::new(imap.clone()));
        }
        ImportFilter { maps }
    }

    pub fn admits(&self, name: &str, path: &str) -> bool {
        self.maps.iter().all(|imap| imap.admits(name, path))
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

/// Joins an inherited path prefix with the prefix of one more import map.
pub fn compose_prefix(inherited: &str, imap: &ImportMap) -> String {
    match (inherited.is_empty(), imap.path_prefix.is_empty()) {
        (_, true) => inherited.to_string(),
        (true, false) => compose_path(&[&imap.path_prefix]),
        (false, false) => compose_path(&[inherited, &imap.path_prefix]),
    }
}
