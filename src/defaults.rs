//! Default values and fixed names used across manifest resolution.
//!
//! This module centralizes the constants shared by the resolver, the
//! configuration layer and the query API, so they are spelled once.

use std::path::PathBuf;

/// Newest manifest schema version this library understands.
pub const SCHEMA_VERSION: &str = "1.2";

/// Every schema version a manifest may declare.
pub const VALID_SCHEMA_VERSIONS: &[&str] = &[
    "0.6.99", "0.7", "0.8", "0.9", "0.10", "0.12", "0.13", "1.0", "1.2",
];

/// Schema version that selects the legacy group-filter semantics.
pub const LEGACY_GROUP_FILTER_VERSION: &str = "0.9";

/// Default manifest file name, in a repository or an import target.
pub const MANIFEST_FILE: &str = "west.yml";

/// Revision used when neither a project nor `defaults:` names one.
pub const DEFAULT_REVISION: &str = "master";

/// Remote name recorded for projects that are given a plain `url`.
pub const DEFAULT_REMOTE_NAME: &str = "origin";

/// Reserved project name and position of the manifest repository.
pub const MANIFEST_PROJECT_NAME: &str = "manifest";
pub const MANIFEST_PROJECT_INDEX: usize = 0;

/// Revision reported for the manifest repository itself.
pub const MANIFEST_PROJECT_REVISION: &str = "HEAD";

/// Deepest chain of nested imports resolved before giving up.
pub const MAX_IMPORT_DEPTH: usize = 64;

/// Workspace control directory, relative to the top directory.
pub const CONTROL_DIR: &str = ".west";

/// Branch that pins the revision a project was last updated to.
pub const MANIFEST_REV_BRANCH: &str = "manifest-rev";
pub const QUAL_MANIFEST_REV_BRANCH: &str = "refs/heads/manifest-rev";

/// Environment variables that override the configuration file locations.
pub const ENV_CONFIG_SYSTEM: &str = "WEST_CONFIG_SYSTEM";
pub const ENV_CONFIG_GLOBAL: &str = "WEST_CONFIG_GLOBAL";
pub const ENV_CONFIG_LOCAL: &str = "WEST_CONFIG_LOCAL";

/// Returns the default system configuration file.
///
/// Only Unix-like hosts have a conventional location; elsewhere the
/// system layer is empty unless `WEST_CONFIG_SYSTEM` is set.
pub fn default_system_config() -> Option<PathBuf> {
    if cfg!(unix) {
        Some(PathBuf::from("/etc/westconfig"))
    } else {
        None
    }
}

/// Returns the default global (per-user) configuration file.
///
/// Uses the home directory reported by the platform, for example
/// `~/.westconfig` on Linux and macOS.
pub fn default_global_config() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".westconfig"))
}

/// Returns the local configuration file of a workspace.
pub fn local_config(topdir: &std::path::Path) -> PathBuf {
    topdir.join(CONTROL_DIR).join("config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version_is_valid() {
        assert!(VALID_SCHEMA_VERSIONS.contains(&SCHEMA_VERSION));
        assert!(VALID_SCHEMA_VERSIONS.contains(&LEGACY_GROUP_FILTER_VERSION));
    }

    #[test]
    fn test_default_global_config_name() {
        if let Some(path) = default_global_config() {
            assert!(path.ends_with(".westconfig"));
        }
    }

    #[test]
    fn test_local_config_under_control_dir() {
        let path = local_config(std::path::Path::new("/ws"));
        assert_eq!(path, PathBuf::from("/ws/.west/config"));
    }

    #[test]
    fn test_manifest_rev_names_agree() {
        assert!(QUAL_MANIFEST_REV_BRANCH.ends_with(MANIFEST_REV_BRANCH));
    }
}
