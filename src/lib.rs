//! # West Manifest Library
//!
//! This library resolves multi-repository workspace manifests: YAML files
//! that list the repositories ("projects") making up a workspace and that
//! may import further manifest fragments from the manifest repository
//! itself or from any listed project. The result is one flattened,
//! deterministic project list and one set of disabled project groups.
//!
//! ## Quick Example
//!
//! ```
//! use west_manifest::{Manifest, ManifestBuilder, MemoryProvider};
//!
//! let mut provider = MemoryProvider::new();
//! provider.add_file(
//!     "hal",
//!     "west.yml",
//!     "manifest:\n  projects:\n    - name: cmsis\n      url: https://example.com/cmsis\n",
//! );
//!
//! let manifest = ManifestBuilder::new()
//!     .provider(provider)
//!     .load_data(
//!         r#"
//! manifest:
//!   projects:
//!     - name: hal
//!       url: https://example.com/hal
//!       import: true
//! "#,
//!     )
//!     .unwrap();
//!
//! let names: Vec<_> = manifest.projects().iter().map(|p| p.name.as_str()).collect();
//! assert_eq!(names, ["manifest", "hal", "cmsis"]);
//! assert!(manifest.has_imports());
//! ```
//!
//! ## Core Concepts
//!
//! - **Documents (`document`, `version`)**: parsing manifest text and
//!   checking its schema version and shape.
//! - **Validation (`validate`)**: name, path and group-name rules.
//! - **Projects (`project`)**: the resolved project records, including the
//!   manifest repository's own record.
//! - **Imports (`import_map`, `resolver`)**: the depth-first resolution of
//!   `import:` directives, with import-map filtering, path prefixes and
//!   cycle detection.
//! - **Filters (`group_filter`)**: group-filter directives and their
//!   precedence, plus the `manifest.project-filter` override.
//! - **Content (`repository`, `git`)**: how imported content is read from
//!   projects, and the importer fallback.
//! - **Configuration (`config`, `defaults`)**: INI configuration layers and
//!   fixed names.
//! - **Queries (`manifest`)**: the read-only API over a resolved manifest.
//!
//! ## Execution Flow
//!
//! 1.  **Configuration**: read `manifest.*` options, when a workspace is known.
//! 2.  **Resolution**: walk the root document and everything it imports,
//!     collecting projects and group-filter batches.
//! 3.  **Path check**: make sure no two projects share a path.
//! 4.  **Precedence**: compute the disabled groups from the collected batches.
//! 5.  **Queries**: answer lookups, activity checks and re-serialization.

pub mod config;
pub mod defaults;
pub mod document;
pub mod error;
pub mod git;
pub mod group_filter;
pub mod import_map;
pub mod manifest;
pub mod project;
pub mod repository;
pub mod resolver;
pub mod validate;
pub mod version;

#[cfg(test)]
mod path_proptest;

pub use error::{Error, Result};
pub use manifest::{Manifest, ManifestBuilder};
pub use project::{Project, Submodule, Submodules};
pub use repository::{ContentProvider, FailingImporter, GitProvider, Importer, MemoryProvider};
pub use resolver::ImportMode;
