//! # Manifest Documents
//!
//! This module defines the typed shape of a manifest document and turns
//! text into it. Loading happens in three steps:
//!
//! 1. The text is read as a generic YAML value with `serde_yaml`. The top
//!    level must be a mapping with a `manifest` key.
//! 2. `manifest: version:` is checked first, so a manifest from a newer
//!    release fails with "upgrade" instead of an unknown-key complaint.
//! 3. The `manifest` mapping is deserialized into [`ManifestData`]. Unknown
//!    keys are rejected, which is the schema conformance check.
//!
//! Values whose type decides control flow (`import:` and `submodules:`) are
//! kept as [`serde_yaml::Value`] and interpreted later with precise
//! complaints, see [`crate::import_map`] and [`crate::project`].
//!
//! ## Example
//!
//! ```
//! use west_manifest::document::{parse_document, ManifestSource};
//!
//! let doc = parse_document(
//!     "manifest:\n  projects:\n    - name: p\n      url: https://example.com/p\n",
//!     &ManifestSource::Data,
//! )
//! .unwrap();
//! assert_eq!(doc.data.projects.unwrap()[0].name, "p");
//! ```

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::defaults::SCHEMA_VERSION;
use crate::error::{Error, Result};
use crate::version::check_schema_version;

/// Where a manifest document came from, used to locate error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    /// A file on the local filesystem
    File(PathBuf),
    /// A file inside a project, obtained through an import
    Import { project: String, file: String },
    /// In-memory text with no file behind it
    Data,
}

impl ManifestSource {
    /// The backing file, if the document was read from disk.
    pub fn file(&self) -> Option<&Path> {
        match self {
            ManifestSource::File(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for ManifestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestSource::File(path) => write!(f, "file: {}", path.display()),
            ManifestSource::Import { project, file } => {
                write!(f, "project {} file {}", project, file)
            }
            ManifestSource::Data => write!(f, "data"),
        }
    }
}

/// A scalar that YAML may read as a string or a number, such as a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Str(s) => write!(f, "{}", s),
        }
    }
}

/// A value written either as one string or as a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            StringOrList::One(s) => vec![s],
            StringOrList::Many(v) => v,
        }
    }
}

/// The `manifest:` mapping of a document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestData {
    /// Raw `version:` value; checked before deserialization
    #[serde(default)]
    pub version: Option<Value>,
    #[serde(rename = "self", default)]
    pub self_section: Option<SelfData>,
    #[serde(rename = "group-filter", default)]
    pub group_filter: Option<Vec<Scalar>>,
    #[serde(default)]
    pub defaults: Option<DefaultsData>,
    #[serde(default)]
    pub remotes: Option<Vec<RemoteData>>,
    #[serde(default)]
    pub projects: Option<Vec<ProjectData>>,
}

/// The `manifest: self:` mapping.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelfData {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub import: Option<Value>,
    #[serde(rename = "west-commands", default)]
    pub west_commands: Option<StringOrList>,
    #[serde(default)]
    pub userdata: Option<Value>,
}

/// The `manifest: defaults:` mapping.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsData {
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
}

/// One entry of `manifest: remotes:`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteData {
    pub name: String,
    #[serde(rename = "url-base")]
    pub url_base: String,
}

/// One entry of `manifest: projects:`, as written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectData {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(rename = "repo-path", default)]
    pub repo_path: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(rename = "clone-depth", default)]
    pub clone_depth: Option<u32>,
    #[serde(rename = "west-commands", default)]
    pub west_commands: Option<StringOrList>,
    #[serde(default)]
    pub import: Option<Value>,
    #[serde(default)]
    pub groups: Option<Vec<Scalar>>,
    #[serde(default)]
    pub submodules: Option<Value>,
    #[serde(default)]
    pub userdata: Option<Value>,
}

/// A document that passed the version and schema checks.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub data: ManifestData,
    /// Declared schema version, or the newest one if none was declared
    pub schema_version: String,
}

/// Parses manifest text and checks its version and schema.
pub fn parse_document(text: &str, source: &ManifestSource) -> Result<LoadedDocument> {
    let location = source.to_string();
    let value: Value = serde_yaml::from_str(text)
        .map_err(|e| Error::malformed(&location, format!("invalid YAML: {}", e)))?;

    let top = match value {
        Value::Mapping(map) => map,
        _ => return Err(Error::malformed(&location, "manifest data must be a mapping")),
    };
    let manifest = match top.get("manifest") {
        Some(Value::Mapping(map)) => map.clone(),
        Some(_) => {
            return Err(Error::malformed(
                &location,
                "\"manifest:\" must be a mapping",
            ))
        }
        None => {
            return Err(Error::malformed(
                &location,
                "manifest data contains no \"manifest:\" section",
            ))
        }
    };

    let schema_version = match manifest.get("version") {
        Some(raw) => check_schema_version(raw, &location, source.file())?,
        None => SCHEMA_VERSION.to_string(),
    };

    let data: ManifestData =
        serde_yaml::from_value(Value::Mapping(manifest)).map_err(|e| Error::MalformedManifest {
            location: location.clone(),
            message: format!("schema error: {}", e),
            hint: None,
        })?;

    Ok(LoadedDocument {
        data,
        schema_version,
    })
}
