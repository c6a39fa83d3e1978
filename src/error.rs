//! # Error Handling
//!
//! This module defines the centralized error type for `west-manifest`. It
//! uses the `thiserror` library to build one `Error` enum covering every
//! failure mode of manifest resolution, with messages that say which file
//! or field is at fault.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant corresponds to one class of
//!   failure:
//!   - malformed manifest data (bad token, bad path, duplicate name,
//!     unknown key), always carrying the location of the offending document;
//!   - a schema version newer than this library understands, which means
//!     "upgrade", not "fix the file";
//!   - an import whose content could not be obtained;
//!   - an import chain that loops back on itself;
//!   - invalid configuration options;
//!   - lookup failures in the query API, collected into one report;
//!   - freezing failures and failed `git` invocations.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`, used
//!   throughout the crate.

use thiserror::Error;

use crate::defaults::SCHEMA_VERSION;

fn render_hint(hint: &Option<String>) -> String {
    hint.as_ref()
        .map(|h| format!("\n  hint: {}", h))
        .unwrap_or_default()
}

fn render_file(file: &Option<std::path::PathBuf>) -> String {
    file.as_ref()
        .map(|f| format!(" (in {})", f.display()))
        .unwrap_or_default()
}

/// Main error type for manifest operations
#[derive(Error, Debug)]
pub enum Error {
    /// The manifest data is invalid.
    ///
    /// `location` identifies the document being resolved when the problem
    /// was found: a file, a project import, or in-memory data.
    #[error("Malformed manifest {location}: {message}{}", render_hint(hint))]
    MalformedManifest {
        location: String,
        message: String,
        /// Optional hint for how to fix the manifest
        hint: Option<String>,
    },

    /// The manifest asks for a schema version newer than this library.
    #[error(
        "Manifest schema version {version}{} is newer than the supported version {}; upgrade to a newer release to use it",
        render_file(file),
        SCHEMA_VERSION
    )]
    UnsupportedVersion {
        version: String,
        file: Option<std::path::PathBuf>,
    },

    /// The content of an import could not be obtained.
    ///
    /// `project` is `None` for imports from the manifest repository itself.
    #[error("{}", render_import(project, target))]
    ImportFailed {
        project: Option<String>,
        target: String,
    },

    /// An import chain refers back to a document that is still being resolved.
    #[error("Manifest import too deep: {chain}")]
    ImportTooDeep { chain: String },

    /// A configuration option has an invalid value.
    #[error("Malformed configuration: {message}")]
    MalformedConfig { message: String },

    /// Some project ids passed to a lookup could not be satisfied.
    #[error("{}", render_lookup(unknown, uncloned))]
    ProjectLookup {
        /// Ids that named no project
        unknown: Vec<String>,
        /// Names of matched projects that are not cloned
        uncloned: Vec<String>,
    },

    /// The manifest could not be frozen to exact revisions.
    #[error("Cannot freeze manifest: project {project}: {message}")]
    Freeze { project: String, message: String },

    /// A read-only `git` invocation failed.
    #[error("Git command failed for {project}: {command} - {stderr}")]
    GitCommand {
        project: String,
        command: String,
        stderr: String,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A version parsing error, wrapped from `semver::Error`.
    #[error("Version parsing error: {0}")]
    Semver(#[from] semver::Error),
}

fn render_import(project: &Option<String>, target: &str) -> String {
    match project {
        Some(name) => format!(
            "project {}: cannot import contents of {}; it may need to be fetched first",
            name, target
        ),
        None => format!(
            "cannot import {}; is it present in the manifest repository?",
            target
        ),
    }
}

fn render_lookup(unknown: &[String], uncloned: &[String]) -> String {
    let mut parts = Vec::new();
    if !unknown.is_empty() {
        parts.push(format!("unknown projects: {}", unknown.join(", ")));
    }
    if !uncloned.is_empty() {
        parts.push(format!("uncloned projects: {}", uncloned.join(", ")));
    }
    parts.join("; ")
}

impl Error {
    /// Builds a `MalformedManifest` error without a hint.
    pub fn malformed(location: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedManifest {
            location: location.into(),
            message: message.into(),
            hint: None,
        }
    }

    /// Returns true for errors that mean the manifest data itself is bad.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::MalformedManifest { .. })
    }
}

/// Result type alias for manifest operations
pub type Result<T> = std::result::Result<T, Error>;
